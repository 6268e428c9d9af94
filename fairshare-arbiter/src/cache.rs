// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! The cluster-state cache.
//!
//! One mutable view of nodes, consumers, and the reclaim queue, guarded by
//! a single mutex owned by the arbitrator. Event handlers never return
//! errors; malformed or unmatched events are logged and dropped.

use std::collections::HashMap;

use fairshare_common::api::{ConsumerObject, Node, Pod, PodPhase};
use fairshare_common::config::ArbiterConfig;
use fairshare_common::constants::EVICTION_RATE_LIMITER_BURST;
use fairshare_common::resource::Resource;
use fairshare_util::fifo::Keyed;
use fairshare_util::flowcontrol::TokenBucket;
use fairshare_util::timed_queue::RateLimitedTimedQueue;

use crate::types::{Consumer, NodeInfo, PodInfo};

/// All mutable cluster state, guarded by the arbitrator's mutex.
pub struct ClusterState {
    pub nodes: HashMap<String, NodeInfo>,
    pub consumers: HashMap<String, Consumer>,
    /// Pending reclaim requests, at most one per consumer. Entries become
    /// eligible after the cooling-off period.
    pub reclaim_queue: RateLimitedTimedQueue<String>,
}

impl ClusterState {
    pub fn new(config: &ArbiterConfig) -> Self {
        Self {
            nodes: HashMap::new(),
            consumers: HashMap::new(),
            reclaim_queue: RateLimitedTimedQueue::new(TokenBucket::new(
                config.eviction_qps,
                EVICTION_RATE_LIMITER_BURST,
            )),
        }
    }

    /// Total allocatable resources across all nodes.
    pub fn total_allocatable(&self) -> Resource {
        let mut total = Resource::empty();
        for node in self.nodes.values() {
            total.add(&node.allocatable);
        }
        total
    }

    // ── Pod events ────────────────────────────────────────────────

    pub fn add_pod(&mut self, pod: &Pod) {
        let info = PodInfo::new(pod);
        let Some(consumer) = self.consumers.get_mut(&info.consumer_name) else {
            tracing::warn!(
                consumer = %info.consumer_name,
                pod = %info.key(),
                "no consumer for pod, ignoring"
            );
            return;
        };
        Self::apply_pod(consumer, info);
    }

    pub fn update_pod(&mut self, old: &Pod, new: &Pod) {
        let old_info = PodInfo::new(old);
        let new_info = PodInfo::new(new);

        if old_info.consumer_name != new_info.consumer_name {
            tracing::error!(
                old = %old_info.key(),
                new = %new_info.key(),
                "pod update changed its consumer, rejecting"
            );
            return;
        }

        let Some(consumer) = self.consumers.get_mut(&new_info.consumer_name) else {
            tracing::warn!(
                consumer = %new_info.consumer_name,
                pod = %new_info.key(),
                "no consumer for pod, ignoring update"
            );
            return;
        };

        Self::retract_pod(consumer, &old_info);
        Self::apply_pod(consumer, new_info);
    }

    pub fn delete_pod(&mut self, pod: &Pod) {
        let info = PodInfo::new(pod);
        let Some(consumer) = self.consumers.get_mut(&info.consumer_name) else {
            return;
        };

        Self::retract_pod(consumer, &info);

        // Terminations in flight are settled by the delete event.
        if let Some(terminated) = consumer.terminating_pods.delete(&info.key()) {
            consumer.terminating.sub(&terminated.resource);
        }
    }

    /// Add one pod's resources to its consumer, keyed by phase. A re-add
    /// of a present key is a no-op.
    fn apply_pod(consumer: &mut Consumer, info: PodInfo) {
        let resource = info.resource;
        match info.phase {
            PodPhase::Running => {
                if consumer.running_pods.add(info) {
                    consumer.allocated.add(&resource);
                }
            }
            PodPhase::Pending => {
                if consumer.pending_pods.add(info) {
                    consumer.request.add(&resource);
                }
            }
            phase => {
                tracing::warn!(pod = %info.key(), ?phase, "ignoring pod phase");
            }
        }
    }

    /// Inverse of [`Self::apply_pod`], using the pod's recorded phase and
    /// resources. Absent keys are no-ops.
    fn retract_pod(consumer: &mut Consumer, info: &PodInfo) {
        match info.phase {
            PodPhase::Running => {
                if let Some(removed) = consumer.running_pods.delete(&info.key()) {
                    consumer.allocated.sub(&removed.resource);
                }
            }
            PodPhase::Pending => {
                if let Some(removed) = consumer.pending_pods.delete(&info.key()) {
                    consumer.request.sub(&removed.resource);
                }
            }
            phase => {
                tracing::warn!(pod = %info.key(), ?phase, "ignoring pod phase");
            }
        }
    }

    // ── Node events ───────────────────────────────────────────────

    pub fn add_node(&mut self, node: &Node) {
        let info = NodeInfo::new(node);
        self.nodes.insert(info.name.clone(), info);
    }

    pub fn update_node(&mut self, node: &Node) {
        self.add_node(node);
    }

    pub fn delete_node(&mut self, node: &Node) {
        self.nodes.remove(&node.metadata.name);
    }

    // ── Consumer events ───────────────────────────────────────────

    /// Install a consumer with fresh accounting. Pods that arrived before
    /// their consumer have been dropped by [`Self::add_pod`].
    pub fn add_consumer(&mut self, object: &ConsumerObject) {
        self.consumers.insert(
            object.metadata.name.clone(),
            Consumer::new(object.metadata.clone()),
        );
    }

    /// Swap in new metadata, preserving every arbitrator-owned field.
    pub fn update_consumer(&mut self, object: &ConsumerObject) {
        let Some(consumer) = self.consumers.get_mut(&object.metadata.name) else {
            tracing::error!(
                consumer = %object.metadata.name,
                "cannot update unknown consumer"
            );
            return;
        };
        consumer.metadata = object.metadata.clone();
    }

    pub fn delete_consumer(&mut self, name: &str) {
        if self.consumers.remove(name).is_none() {
            tracing::error!(consumer = %name, "cannot remove unknown consumer");
        }
    }
}
