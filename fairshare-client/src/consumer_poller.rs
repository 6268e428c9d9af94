// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Poll-diff adapter for the consumer collection.
//!
//! The consumer store has no watch endpoint, so the adapter lists the
//! collection every period and synthesizes add/update/delete events from
//! the difference against its event source's store.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use fairshare_common::api::{ConsumerObject, WatchEvent};
use fairshare_util::backoff::ExponentialBackoff;
use fairshare_util::fifo::Keyed;
use tokio::sync::mpsc;

use crate::source::EventSource;
use crate::traits::ConsumerApi;

/// Polls the consumer collection and feeds an [`EventSource`].
pub struct ConsumerPoller {
    api: Arc<dyn ConsumerApi>,
    source: Arc<EventSource<ConsumerObject>>,
    period: Duration,
}

impl ConsumerPoller {
    pub fn new(
        api: Arc<dyn ConsumerApi>,
        source: Arc<EventSource<ConsumerObject>>,
        period: Duration,
    ) -> Self {
        Self {
            api,
            source,
            period,
        }
    }

    pub fn source(&self) -> &Arc<EventSource<ConsumerObject>> {
        &self.source
    }

    /// One list-and-diff pass. Split out from the loop for tests.
    pub async fn poll_once(&self) -> Result<(), fairshare_common::error::FairshareError> {
        let listed = self.api.list().await?;

        let mut seen = HashSet::new();
        for consumer in listed.items {
            let key = consumer.key();
            seen.insert(key.clone());
            match self.source.get(&key) {
                Some(old) => {
                    if old != consumer {
                        self.source.apply(WatchEvent::Updated {
                            old,
                            new: consumer,
                        });
                    }
                }
                None => self.source.apply(WatchEvent::Added(consumer)),
            }
        }

        for stale in self
            .source
            .list()
            .into_iter()
            .filter(|consumer| !seen.contains(&consumer.key()))
        {
            self.source.apply(WatchEvent::Deleted(stale));
        }

        Ok(())
    }

    /// Run the poll loop until a cancel message (or sender drop) arrives.
    /// Transient list failures back off exponentially and reset on the
    /// next success.
    pub fn spawn(self: Arc<Self>) -> mpsc::Sender<()> {
        let (cancel_tx, mut cancel_rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            let mut backoff = ExponentialBackoff::new(
                self.period,
                2.0,
                Duration::from_secs(30).max(self.period),
            );
            loop {
                let sleep = match self.poll_once().await {
                    Ok(()) => {
                        backoff.reset();
                        self.period
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "consumer list failed");
                        backoff.next_delay_with_jitter()
                    }
                };

                tokio::select! {
                    _ = cancel_rx.recv() => {
                        tracing::debug!("consumer poller stopped");
                        break;
                    }
                    _ = tokio::time::sleep(sleep) => {}
                }
            }
        });

        cancel_tx
    }
}
