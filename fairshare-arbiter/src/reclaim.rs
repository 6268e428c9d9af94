// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! The reclaim worker.
//!
//! Drains reclaim requests once their cooling-off period has expired and
//! walks the consumer's running pods in FIFO order, unbinding until the
//! overage is covered. Unbind RPCs never run under the cache lock: the
//! victim list is captured under the lock, the RPCs happen outside it,
//! and the terminating bookkeeping is applied on re-acquire.

use std::sync::Arc;
use std::time::{Duration, Instant};

use fairshare_client::traits::PodApi;
use fairshare_common::config::ArbiterConfig;
use fairshare_common::constants::DEFAULT_FAULT_ZONE;
use fairshare_common::events::{
    EventKind, EventRecorder, ObjectRef, REASON_EVICTION_FAILED,
};
use fairshare_common::resource::Resource;
use fairshare_stats::{evictions_total, zone_tags, Counter};
use fairshare_util::fifo::Keyed;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::cache::ClusterState;
use crate::types::PodInfo;

/// One consumer's worth of reclaim work for a tick.
struct ReclaimWork {
    consumer_name: String,
    wanted: Resource,
    candidates: Vec<PodInfo>,
}

/// Terminates running pods of overusing consumers.
pub struct ReclaimWorker {
    state: Arc<Mutex<ClusterState>>,
    pod_api: Arc<dyn PodApi>,
    recorder: Arc<dyn EventRecorder>,
    evictions: Counter,
    config: ArbiterConfig,
}

impl ReclaimWorker {
    pub fn new(
        state: Arc<Mutex<ClusterState>>,
        pod_api: Arc<dyn PodApi>,
        recorder: Arc<dyn EventRecorder>,
        config: ArbiterConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            state,
            pod_api,
            recorder,
            evictions: evictions_total(),
            config,
        })
    }

    /// Eviction attempts so far, by zone.
    pub fn evictions(&self) -> &Counter {
        &self.evictions
    }

    /// Replace a zone's eviction rate limit if it changed.
    pub fn swap_limiter(&self, qps: f32) {
        self.state.lock().reclaim_queue.swap_limiter(qps);
    }

    /// One reclaim tick.
    ///
    /// A request is forgotten once a pass observes its overage gone;
    /// otherwise it stays queued and is re-examined after the retry
    /// delay. Running this twice with no elapsed time is a no-op the
    /// second time.
    pub async fn reclaim_once(&self) {
        let now = Instant::now();

        let mut work: Vec<ReclaimWork> = Vec::new();
        {
            let mut guard = self.state.lock();
            let ClusterState {
                consumers,
                reclaim_queue,
                ..
            } = &mut *guard;

            reclaim_queue.try_process_at(now, |entry| {
                let Some(consumer) = consumers.get(&entry.value) else {
                    // Consumer vanished; nothing left to reclaim.
                    return (true, Duration::ZERO);
                };
                let wanted = consumer.reclaim_wanted();
                if wanted.is_empty() {
                    return (true, Duration::ZERO);
                }
                work.push(ReclaimWork {
                    consumer_name: entry.value.clone(),
                    wanted,
                    candidates: consumer.running_pods.list(),
                });
                (false, self.config.reclaim_retry_delay)
            });
        }

        for item in work {
            self.reclaim_consumer(item).await;
        }
    }

    async fn reclaim_consumer(&self, work: ReclaimWork) {
        let mut wanted = work.wanted;
        let mut unbound: Vec<PodInfo> = Vec::new();

        for pod in work.candidates {
            if wanted.is_empty() {
                break;
            }

            self.evictions.increment(&zone_tags(DEFAULT_FAULT_ZONE), 1);
            match self.pod_api.unbind(&pod.namespace, &pod.name).await {
                Ok(()) => {
                    wanted.sub(&pod.resource);
                    unbound.push(pod);
                }
                // The pod vanished on its own; its delete event settles
                // the books.
                Err(err) if err.is_not_found() => {
                    tracing::debug!(pod = %pod.key(), "pod already gone");
                    wanted.sub(&pod.resource);
                }
                Err(err) => {
                    tracing::warn!(pod = %pod.key(), error = %err, "unbind failed");
                    self.recorder.record(
                        &ObjectRef::new("Pod", &pod.namespace, &pod.name),
                        EventKind::Warning,
                        REASON_EVICTION_FAILED,
                        &format!("failed to unbind pod: {err}"),
                    );
                }
            }
        }

        if unbound.is_empty() {
            return;
        }

        let mut guard = self.state.lock();
        let Some(consumer) = guard.consumers.get_mut(&work.consumer_name) else {
            return;
        };
        for pod in unbound {
            // A delete event may have raced the unbind; only move pods
            // that are still accounted as running.
            if let Some(live) = consumer.running_pods.delete(&pod.key()) {
                consumer.allocated.sub(&live.resource);
                consumer.terminating.add(&live.resource);
                consumer.terminating_pods.add(live);
            }
        }
    }

    /// Run the reclaim loop until cancelled.
    pub fn spawn(self: &Arc<Self>) -> mpsc::Sender<()> {
        let (cancel_tx, mut cancel_rx) = mpsc::channel::<()>(1);
        let this = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel_rx.recv() => {
                        tracing::info!("reclaim worker stopped");
                        break;
                    }
                    _ = tokio::time::sleep(this.config.reclaim_period) => {
                        this.reclaim_once().await;
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
    use crate::types::Consumer;
    use fairshare_common::api::{ObjectMeta, PodPhase};
    use fairshare_test_utils::mock_clients::{CapturingEventRecorder, FakePodApi};

    const MIB: f64 = 1024.0 * 1024.0;

    fn pod_info(consumer: &str, name: &str, cpu: f64, mem: f64) -> PodInfo {
        PodInfo {
            name: name.to_string(),
            namespace: consumer.to_string(),
            consumer_name: consumer.to_string(),
            phase: PodPhase::Running,
            hostname: String::new(),
            resource: Resource::new(cpu, mem),
        }
    }

    struct Harness {
        worker: Arc<ReclaimWorker>,
        pod_api: FakePodApi,
        recorder: CapturingEventRecorder,
        state: Arc<Mutex<ClusterState>>,
    }

    fn harness() -> Harness {
        let config = ArbiterConfig {
            reclaim_cooldown: Duration::ZERO,
            // Tests drive ticks explicitly; do not rate-limit them.
            eviction_qps: 0.0,
            ..Default::default()
        };
        let state = Arc::new(Mutex::new(ClusterState::new(&config)));
        let pod_api = FakePodApi::new();
        let recorder = CapturingEventRecorder::new();
        let worker = ReclaimWorker::new(
            Arc::clone(&state),
            Arc::new(pod_api.clone()),
            Arc::new(recorder.clone()),
            config,
        );
        Harness {
            worker,
            pod_api,
            recorder,
            state,
        }
    }

    /// A consumer over its deserved share by `overage_pods` running pods.
    fn seed_overuser(state: &Arc<Mutex<ClusterState>>, name: &str, pods: u32, deserved_pods: u32) {
        let mut guard = state.lock();
        let mut consumer = Consumer::new(ObjectMeta::named("", name));
        for i in 0..pods {
            let pod = pod_info(name, &format!("p{i}"), 1000.0, 100.0 * MIB);
            consumer.allocated.add(&pod.resource);
            consumer.running_pods.add(pod);
        }
        consumer.deserved = Some(Resource::new(
            1000.0 * deserved_pods as f64,
            100.0 * MIB * deserved_pods as f64,
        ));
        guard.consumers.insert(name.to_string(), consumer);
        guard.reclaim_queue.add(name.to_string(), "");
    }

    #[tokio::test]
    async fn test_unbinds_in_fifo_order_until_satisfied() {
        let h = harness();
        seed_overuser(&h.state, "tenant-b", 4, 2);

        h.worker.reclaim_once().await;

        assert_eq!(h.pod_api.unbound(), vec!["tenant-b/p0", "tenant-b/p1"]);

        let guard = h.state.lock();
        let consumer = &guard.consumers["tenant-b"];
        assert_eq!(consumer.running_pods.len(), 2);
        assert_eq!(consumer.terminating_pods.len(), 2);
        assert_eq!(
            consumer.terminating,
            Resource::new(2000.0, 200.0 * MIB)
        );
        assert!(consumer.reclaim_wanted().is_empty());
    }

    #[tokio::test]
    async fn test_request_retained_until_satisfied_then_forgotten() {
        let h = harness();
        seed_overuser(&h.state, "tenant-b", 4, 2);

        h.worker.reclaim_once().await;
        assert!(
            h.state.lock().reclaim_queue.len() == 1,
            "request stays queued until a pass sees the gap closed"
        );

        // The retry delay has to pass before the request is re-examined.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        h.worker.reclaim_once().await;
        assert!(h.state.lock().reclaim_queue.is_empty());
        assert_eq!(h.pod_api.num_unbinds(), 2, "no further victims");
    }

    #[tokio::test]
    async fn test_immediate_second_tick_is_noop() {
        let h = harness();
        seed_overuser(&h.state, "tenant-b", 4, 2);

        h.worker.reclaim_once().await;
        let first = h.pod_api.unbound();
        h.worker.reclaim_once().await;

        assert_eq!(h.pod_api.unbound(), first, "no time elapsed, no new work");
    }

    #[tokio::test]
    async fn test_unbind_failure_moves_to_next_pod() {
        let h = harness();
        seed_overuser(&h.state, "tenant-b", 4, 3);
        h.pod_api.fail_unbind("tenant-b/p0");

        h.worker.reclaim_once().await;

        // p0 failed, p1 covered the single-pod gap.
        assert_eq!(h.pod_api.unbound(), vec!["tenant-b/p1"]);
        assert_eq!(h.recorder.reasons(), vec![REASON_EVICTION_FAILED]);

        let guard = h.state.lock();
        let consumer = &guard.consumers["tenant-b"];
        assert!(consumer.running_pods.contains("tenant-b/p0"));
        assert_eq!(consumer.terminating_pods.len(), 1);
    }

    #[tokio::test]
    async fn test_counts_attempts_per_zone() {
        let h = harness();
        seed_overuser(&h.state, "tenant-b", 4, 2);
        h.pod_api.fail_unbind("tenant-b/p0");

        h.worker.reclaim_once().await;

        // Three attempts: p0 (failed), p1 and p2 (covered the gap).
        assert_eq!(
            h.worker.evictions().get(&zone_tags(DEFAULT_FAULT_ZONE)),
            3
        );
    }

    #[tokio::test]
    async fn test_vanished_consumer_drops_request() {
        let h = harness();
        {
            let mut guard = h.state.lock();
            guard.reclaim_queue.add("ghost".to_string(), "");
        }

        h.worker.reclaim_once().await;
        assert!(h.state.lock().reclaim_queue.is_empty());
        assert_eq!(h.pod_api.num_unbinds(), 0);
    }
}
