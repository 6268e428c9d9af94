// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Event sources: callback registration over a stream of object changes.
//!
//! A source keeps a local keyed store of the latest objects and fans each
//! change out to registered handlers. Handlers run on the source's task
//! and must not block.

use std::collections::HashMap;
use std::sync::Arc;

use fairshare_common::api::WatchEvent;
use fairshare_util::fifo::Keyed;
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Callbacks for one subscriber. Unset callbacks are skipped.
#[derive(Default)]
pub struct EventHandlers<T> {
    pub on_add: Option<Arc<dyn Fn(&T) + Send + Sync>>,
    pub on_update: Option<Arc<dyn Fn(&T, &T) + Send + Sync>>,
    pub on_delete: Option<Arc<dyn Fn(&T) + Send + Sync>>,
}

/// A source of add/update/delete events with a local object store.
pub struct EventSource<T: Keyed + Clone> {
    store: Mutex<HashMap<String, T>>,
    handlers: Mutex<Vec<EventHandlers<T>>>,
}

impl<T: Keyed + Clone> Default for EventSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Keyed + Clone> EventSource<T> {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
            handlers: Mutex::new(Vec::new()),
        }
    }

    /// Register a subscriber. Events observed before registration are not
    /// replayed; subscribers that need the current state read `list()`.
    pub fn add_event_handler(&self, handlers: EventHandlers<T>) {
        self.handlers.lock().push(handlers);
    }

    /// Apply one event to the store and dispatch it to every subscriber.
    pub fn apply(&self, event: WatchEvent<T>) {
        match &event {
            WatchEvent::Added(obj) => {
                self.store.lock().insert(obj.key(), obj.clone());
            }
            WatchEvent::Updated { new, .. } => {
                self.store.lock().insert(new.key(), new.clone());
            }
            WatchEvent::Deleted(obj) => {
                self.store.lock().remove(&obj.key());
            }
        }

        let handlers = self.handlers.lock();
        for subscriber in handlers.iter() {
            match &event {
                WatchEvent::Added(obj) => {
                    if let Some(on_add) = &subscriber.on_add {
                        on_add(obj);
                    }
                }
                WatchEvent::Updated { old, new } => {
                    if let Some(on_update) = &subscriber.on_update {
                        on_update(old, new);
                    }
                }
                WatchEvent::Deleted(obj) => {
                    if let Some(on_delete) = &subscriber.on_delete {
                        on_delete(obj);
                    }
                }
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<T> {
        self.store.lock().get(key).cloned()
    }

    pub fn list(&self) -> Vec<T> {
        self.store.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }
}

impl<T: Keyed + Clone + Send + 'static> EventSource<T> {
    /// Drive this source from a channel of events. The task ends when the
    /// sender side closes.
    pub fn spawn(self: &Arc<Self>, mut events: mpsc::Receiver<WatchEvent<T>>) {
        let source = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                source.apply(event);
            }
            tracing::debug!("event source stream closed");
        });
    }
}
