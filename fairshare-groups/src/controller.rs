// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! The group status controller.
//!
//! Rolls per-pod phase counters up onto each PodSchedulingGroup through a
//! rate-limited key queue: pod and group events enqueue group keys, a
//! worker drains them, and a periodic resync sweeps every known group.

use std::sync::Arc;
use std::time::{Duration, Instant};

use fairshare_client::source::{EventHandlers, EventSource};
use fairshare_client::traits::GroupApi;
use fairshare_common::api::{
    Pod, PodPhase, PodSchedulingGroup, PodSchedulingGroupStatus,
};
use fairshare_common::config::ArbiterConfig;
use fairshare_common::error::{FairshareError, FairshareResult};
use fairshare_common::events::{
    EventKind, EventRecorder, ObjectRef, REASON_MULTIPLE_POD_SCHEDULING_GROUPS, REASON_NO_PODS,
};
use fairshare_util::fifo::Keyed;
use fairshare_util::flowcontrol::TokenBucket;
use fairshare_util::time::Stopwatch;
use fairshare_util::timed_queue::RateLimitedTimedQueue;
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// How often the worker drains the key queue.
const WORKER_PERIOD: Duration = Duration::from_secs(1);

/// Sync attempts per second; generous, the queue mainly dedups here.
const SYNC_QPS: f32 = 50.0;
const SYNC_BURST: u32 = 10;

/// Maintains `PodSchedulingGroup.status` from observed pods.
pub struct GroupStatusController {
    api: Arc<dyn GroupApi>,
    recorder: Arc<dyn EventRecorder>,
    /// Group keys awaiting a sync, at most one entry per key.
    queue: Mutex<RateLimitedTimedQueue<String>>,
    /// Local view of all groups, fed by the group event source.
    groups: Arc<EventSource<PodSchedulingGroup>>,
    config: ArbiterConfig,
}

impl GroupStatusController {
    pub fn new(
        api: Arc<dyn GroupApi>,
        recorder: Arc<dyn EventRecorder>,
        groups: Arc<EventSource<PodSchedulingGroup>>,
        config: ArbiterConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            api,
            recorder,
            queue: Mutex::new(RateLimitedTimedQueue::new(TokenBucket::new(
                SYNC_QPS, SYNC_BURST,
            ))),
            groups,
            config,
        })
    }

    // ── Event wiring ──────────────────────────────────────────────

    /// Enqueue a group on any of its own events. The handlers must be
    /// registered on the same source handed to [`Self::new`].
    pub fn register_group_source(self: &Arc<Self>, source: &EventSource<PodSchedulingGroup>) {
        let add_self = Arc::clone(self);
        let update_self = Arc::clone(self);
        let delete_self = Arc::clone(self);
        source.add_event_handler(EventHandlers {
            on_add: Some(Arc::new(move |group: &PodSchedulingGroup| {
                add_self.enqueue(group.key());
            })),
            on_update: Some(Arc::new(
                move |_old: &PodSchedulingGroup, new: &PodSchedulingGroup| {
                    update_self.enqueue(new.key());
                },
            )),
            on_delete: Some(Arc::new(move |group: &PodSchedulingGroup| {
                delete_self.enqueue(group.key());
            })),
        });
    }

    /// Enqueue the matching group on any pod event.
    pub fn register_pod_source(self: &Arc<Self>, source: &EventSource<Pod>) {
        let add_self = Arc::clone(self);
        let update_self = Arc::clone(self);
        let delete_self = Arc::clone(self);
        source.add_event_handler(EventHandlers {
            on_add: Some(Arc::new(move |pod: &Pod| {
                add_self.enqueue_for_pod(pod);
            })),
            on_update: Some(Arc::new(move |_old: &Pod, new: &Pod| {
                update_self.enqueue_for_pod(new);
            })),
            on_delete: Some(Arc::new(move |pod: &Pod| {
                delete_self.enqueue_for_pod(pod);
            })),
        });
    }

    fn enqueue(&self, key: String) {
        self.queue.lock().add(key, "");
    }

    fn enqueue_after(&self, key: String, delay: Duration) {
        self.queue.lock().add_after(key, "", delay);
    }

    /// The group a pod rolls up into: the lexicographically-first match,
    /// with a warning event on the pod when several groups claim it.
    pub fn group_for_pod(&self, pod: &Pod) -> Option<PodSchedulingGroup> {
        if pod.metadata.labels.is_empty() {
            return None;
        }

        let mut matches: Vec<PodSchedulingGroup> = self
            .groups
            .list()
            .into_iter()
            .filter(|group| {
                group.metadata.namespace == pod.metadata.namespace && group.selects(pod)
            })
            .collect();
        matches.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));

        if matches.len() > 1 {
            let chosen = &matches[0].metadata.name;
            tracing::warn!(
                pod = %pod.metadata.key(),
                chosen = %chosen,
                "pod matches multiple scheduling groups"
            );
            self.recorder.record(
                &ObjectRef::new("Pod", &pod.metadata.namespace, &pod.metadata.name),
                EventKind::Warning,
                REASON_MULTIPLE_POD_SCHEDULING_GROUPS,
                &format!("pod matches multiple scheduling groups; chose {chosen}"),
            );
        }
        matches.into_iter().next()
    }

    fn enqueue_for_pod(&self, pod: &Pod) {
        match self.group_for_pod(pod) {
            Some(group) => self.enqueue(group.key()),
            None => {
                tracing::debug!(pod = %pod.metadata.key(), "no scheduling group for pod");
            }
        }
    }

    // ── Sync ──────────────────────────────────────────────────────

    /// Drain every eligible key once, re-enqueueing failures with the
    /// retry delay.
    pub async fn process_once(&self) {
        let mut due: Vec<String> = Vec::new();
        self.queue.lock().try_process_at(Instant::now(), |entry| {
            due.push(entry.value.clone());
            (true, Duration::ZERO)
        });

        for key in due {
            if let Err(err) = self.sync(&key).await {
                tracing::warn!(group = %key, error = %err, "sync failed, requeueing");
                self.enqueue_after(key, self.config.group_retry_delay);
            }
        }
    }

    /// Re-enqueue every known group.
    pub fn resync(&self) {
        for group in self.groups.list() {
            self.enqueue(group.key());
        }
    }

    /// Bring one group's status counters up to date.
    pub async fn sync(&self, key: &str) -> FairshareResult<()> {
        let watch = Stopwatch::new();
        let Some((namespace, name)) = key.split_once('/') else {
            tracing::error!(group = %key, "malformed group key, dropping");
            return Ok(());
        };

        let group = match self.api.get(namespace, name).await {
            Ok(group) => group,
            Err(err) if err.is_not_found() => {
                tracing::debug!(group = %key, "group deleted before sync");
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let pods: Vec<Pod> = self
            .api
            .list_pods(namespace)
            .await?
            .into_iter()
            .filter(|pod| group.selects(pod))
            .collect();

        if pods.is_empty() {
            self.recorder.record(
                &ObjectRef::new("PodSchedulingGroup", namespace, name),
                EventKind::Warning,
                REASON_NO_PODS,
                "selector matched no pods",
            );
            return Ok(());
        }

        let mut status = PodSchedulingGroupStatus {
            replicas: pods.len() as i32,
            min_available: group.spec.min_available.unwrap_or(1),
            ..Default::default()
        };
        for pod in &pods {
            match pod.status.phase {
                PodPhase::Pending => status.pending += 1,
                PodPhase::Running => status.running += 1,
                PodPhase::Succeeded => status.succeeded += 1,
                PodPhase::Failed => status.failed += 1,
                PodPhase::Unknown => {}
            }
        }

        let result = self.write_status(group, status).await;
        tracing::debug!(group = %key, elapsed_ms = watch.elapsed_ms(), "synced group");
        result
    }

    /// Write the status subresource, re-reading on conflict up to the
    /// configured retry count.
    async fn write_status(
        &self,
        group: PodSchedulingGroup,
        status: PodSchedulingGroupStatus,
    ) -> FairshareResult<()> {
        let namespace = group.metadata.namespace.clone();
        let name = group.metadata.name.clone();
        let mut target = group;
        let mut last_err = FairshareError::conflict("status write not attempted");

        for attempt in 0..=self.config.status_update_retries {
            target.status = status;
            match self.api.update_status(&target).await {
                Ok(_) => return Ok(()),
                // The group vanished mid-write; its deletion makes the
                // counters moot.
                Err(err) if err.is_not_found() => return Ok(()),
                Err(err) if err.is_conflict() && attempt < self.config.status_update_retries => {
                    tracing::debug!(
                        group = %format!("{namespace}/{name}"),
                        attempt,
                        "status write conflicted, re-reading"
                    );
                    last_err = err;
                    target = self.api.get(&namespace, &name).await?;
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err)
    }

    /// Run the worker and resync loops until cancelled.
    pub fn spawn(self: &Arc<Self>) -> mpsc::Sender<()> {
        let (cancel_tx, mut cancel_rx) = mpsc::channel::<()>(1);
        let this = Arc::clone(self);

        tokio::spawn(async move {
            let mut worker_tick = tokio::time::interval(WORKER_PERIOD);
            let mut resync_tick = tokio::time::interval(this.config.group_resync_period);
            // The immediate first resync tick is harmless: the store is
            // usually empty at startup.
            loop {
                tokio::select! {
                    _ = cancel_rx.recv() => {
                        tracing::info!("group status controller stopped");
                        break;
                    }
                    _ = worker_tick.tick() => {
                        this.process_once().await;
                    }
                    _ = resync_tick.tick() => {
                        this.resync();
                    }
                }
            }
        });

        cancel_tx
    }
}
