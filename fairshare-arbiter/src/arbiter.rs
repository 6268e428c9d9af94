// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! The arbitrator: the periodic allocate → detect overuse → publish loop.

use std::sync::Arc;

use fairshare_client::source::{EventHandlers, EventSource};
use fairshare_client::traits::ConsumerApi;
use fairshare_common::api::{ConsumerObject, Node, Pod};
use fairshare_common::config::ArbiterConfig;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::allocator::Allocator;
use crate::cache::ClusterState;
use crate::types::Consumer;

/// Computes deserved shares, raises reclaim requests, and publishes
/// consumer records. The cluster state is shared with the reclaim worker
/// and the event handlers this arbitrator registers.
pub struct Arbiter {
    state: Arc<Mutex<ClusterState>>,
    allocator: Box<dyn Allocator>,
    consumer_api: Arc<dyn ConsumerApi>,
    config: ArbiterConfig,
}

impl Arbiter {
    pub fn new(
        state: Arc<Mutex<ClusterState>>,
        allocator: Box<dyn Allocator>,
        consumer_api: Arc<dyn ConsumerApi>,
        config: ArbiterConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            state,
            allocator,
            consumer_api,
            config,
        })
    }

    pub fn state(&self) -> Arc<Mutex<ClusterState>> {
        Arc::clone(&self.state)
    }

    // ── Event wiring ──────────────────────────────────────────────

    pub fn register_pod_source(&self, source: &EventSource<Pod>) {
        let add_state = Arc::clone(&self.state);
        let update_state = Arc::clone(&self.state);
        let delete_state = Arc::clone(&self.state);
        source.add_event_handler(EventHandlers {
            on_add: Some(Arc::new(move |pod: &Pod| {
                add_state.lock().add_pod(pod);
            })),
            on_update: Some(Arc::new(move |old: &Pod, new: &Pod| {
                update_state.lock().update_pod(old, new);
            })),
            on_delete: Some(Arc::new(move |pod: &Pod| {
                delete_state.lock().delete_pod(pod);
            })),
        });
    }

    pub fn register_node_source(&self, source: &EventSource<Node>) {
        let add_state = Arc::clone(&self.state);
        let update_state = Arc::clone(&self.state);
        let delete_state = Arc::clone(&self.state);
        source.add_event_handler(EventHandlers {
            on_add: Some(Arc::new(move |node: &Node| {
                add_state.lock().add_node(node);
            })),
            on_update: Some(Arc::new(move |_old: &Node, new: &Node| {
                update_state.lock().update_node(new);
            })),
            on_delete: Some(Arc::new(move |node: &Node| {
                delete_state.lock().delete_node(node);
            })),
        });
    }

    pub fn register_consumer_source(&self, source: &EventSource<ConsumerObject>) {
        let add_state = Arc::clone(&self.state);
        let update_state = Arc::clone(&self.state);
        let delete_state = Arc::clone(&self.state);
        source.add_event_handler(EventHandlers {
            on_add: Some(Arc::new(move |consumer: &ConsumerObject| {
                add_state.lock().add_consumer(consumer);
            })),
            on_update: Some(Arc::new(move |_old: &ConsumerObject, new: &ConsumerObject| {
                update_state.lock().update_consumer(new);
            })),
            on_delete: Some(Arc::new(move |consumer: &ConsumerObject| {
                delete_state.lock().delete_consumer(&consumer.metadata.name);
            })),
        });
    }

    // ── Allocation pass ───────────────────────────────────────────

    /// One pass: snapshot, allocate, write deserved back, raise reclaim
    /// requests for overusers, publish every consumer.
    ///
    /// The allocator runs on copies so event handlers keep flowing; a pod
    /// arriving mid-pass lands in the next pass. Publishing happens after
    /// the lock is dropped.
    pub async fn allocate_once(&self) {
        let (nodes, mut snapshot) = {
            let guard = self.state.lock();
            (guard.nodes.clone(), guard.consumers.clone())
        };

        self.allocator.allocate(&nodes, &mut snapshot);

        let to_publish: Vec<ConsumerObject> = {
            let mut guard = self.state.lock();
            let ClusterState {
                consumers,
                reclaim_queue,
                ..
            } = &mut *guard;

            for (name, computed) in &snapshot {
                if let Some(live) = consumers.get_mut(name) {
                    live.deserved = computed.deserved;
                }
            }

            for (name, consumer) in consumers.iter() {
                let wanted = consumer.reclaim_wanted();
                if !wanted.is_empty()
                    && reclaim_queue.add_after(
                        name.clone(),
                        consumer.metadata.uid.clone(),
                        self.config.reclaim_cooldown,
                    )
                {
                    tracing::info!(consumer = %name, wanted = %wanted, "reclaim requested");
                }
            }

            consumers.values().map(Consumer::to_object).collect()
        };

        for object in to_publish {
            if let Err(err) = self.consumer_api.update(&object).await {
                tracing::error!(
                    consumer = %object.metadata.name,
                    error = %err,
                    "failed to publish consumer"
                );
            }
        }
    }

    /// Run the allocation loop until cancelled.
    pub fn spawn(self: &Arc<Self>) -> mpsc::Sender<()> {
        let (cancel_tx, mut cancel_rx) = mpsc::channel::<()>(1);
        let this = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel_rx.recv() => {
                        tracing::info!("arbitrator stopped");
                        break;
                    }
                    _ = tokio::time::sleep(this.config.allocate_period) => {
                        this.allocate_once().await;
                    }
                }
            }
        });

        cancel_tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::DrfAllocator;
    use fairshare_common::api::{ObjectMeta, PodPhase, WatchEvent};
    use fairshare_common::resource::Resource;
    use fairshare_test_utils::mock_clients::FakeConsumerApi;
    use fairshare_test_utils::{make_node, make_pod};

    fn harness() -> (Arc<Arbiter>, FakeConsumerApi) {
        let config = ArbiterConfig::default();
        let state = Arc::new(Mutex::new(ClusterState::new(&config)));
        let api = FakeConsumerApi::new();
        let arbiter = Arbiter::new(
            state,
            Box::new(DrfAllocator::new()),
            Arc::new(api.clone()),
            config,
        );
        (arbiter, api)
    }

    fn consumer_object(name: &str) -> ConsumerObject {
        ConsumerObject {
            metadata: ObjectMeta::named("", name),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_sources_feed_the_cache() {
        let (arbiter, _api) = harness();

        let consumers = EventSource::new();
        arbiter.register_consumer_source(&consumers);
        consumers.apply(WatchEvent::Added(consumer_object("tenant-a")));

        let pods = EventSource::new();
        arbiter.register_pod_source(&pods);
        pods.apply(WatchEvent::Added(make_pod(
            "tenant-a",
            "p1",
            PodPhase::Running,
            100.0,
            10.0,
        )));

        let nodes = EventSource::new();
        arbiter.register_node_source(&nodes);
        nodes.apply(WatchEvent::Added(make_node("n1", 1000.0, 2048.0)));

        let state = arbiter.state();
        let guard = state.lock();
        assert_eq!(guard.nodes.len(), 1);
        assert_eq!(
            guard.consumers["tenant-a"].allocated,
            Resource::new(100.0, 10.0)
        );
    }

    #[tokio::test]
    async fn test_allocate_once_publishes_every_consumer() {
        let (arbiter, api) = harness();
        {
            let state = arbiter.state();
            let mut guard = state.lock();
            guard.add_consumer(&consumer_object("tenant-a"));
            guard.add_consumer(&consumer_object("tenant-b"));
        }

        arbiter.allocate_once().await;

        assert_eq!(api.num_updates(), 2);
        let published = api.last_update_of("tenant-a").unwrap();
        assert_eq!(published.metadata.resource_version, "0");
        assert_eq!(published.deserved, Some(Resource::empty()));
    }

    #[tokio::test]
    async fn test_overuse_raises_one_reclaim_request() {
        let (arbiter, _api) = harness();
        {
            let state = arbiter.state();
            let mut guard = state.lock();
            guard.add_consumer(&consumer_object("tenant-a"));
            // Overbooked: running usage with no node backing it.
            let consumer = guard.consumers.get_mut("tenant-a").unwrap();
            consumer.allocated = Resource::new(5000.0, 0.0);
        }

        arbiter.allocate_once().await;
        arbiter.allocate_once().await;

        let state = arbiter.state();
        let guard = state.lock();
        assert_eq!(guard.reclaim_queue.len(), 1, "requests dedup by consumer");
    }
}
