// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Cache-side views of pods, nodes, and consumers.
//!
//! These are name-keyed value snapshots; nothing here points back into the
//! API objects they were built from.

use fairshare_common::api::{ConsumerObject, Node, ObjectMeta, Pod, PodPhase};
use fairshare_common::resource::Resource;
use fairshare_util::fifo::{Fifo, Keyed};

/// What the arbitrator tracks about one pod.
#[derive(Debug, Clone, PartialEq)]
pub struct PodInfo {
    pub name: String,
    pub namespace: String,
    /// The tenant this pod is accounted against; equals the namespace.
    pub consumer_name: String,
    pub phase: PodPhase,
    pub hostname: String,
    pub resource: Resource,
}

impl PodInfo {
    pub fn new(pod: &Pod) -> Self {
        Self {
            name: pod.metadata.name.clone(),
            namespace: pod.metadata.namespace.clone(),
            consumer_name: pod.metadata.namespace.clone(),
            phase: pod.status.phase,
            hostname: pod.spec.node_name.clone(),
            resource: pod.resource_request(),
        }
    }
}

impl Keyed for PodInfo {
    fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// What the arbitrator tracks about one node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo {
    pub name: String,
    pub allocatable: Resource,
    pub capacity: Resource,
}

impl NodeInfo {
    pub fn new(node: &Node) -> Self {
        Self {
            name: node.metadata.name.clone(),
            allocatable: node.status.allocatable,
            capacity: node.status.capacity,
        }
    }
}

/// One tenant's accounting entry in the cluster-state cache.
///
/// `request`, `allocated`, and the pod FIFOs are maintained by the event
/// handlers; `deserved` is written only by the allocation pass and stays
/// `None` until the first pass completes. `terminating` covers pods whose
/// unbind was issued but whose delete event has not been observed yet.
#[derive(Debug, Clone)]
pub struct Consumer {
    pub metadata: ObjectMeta,
    /// Sum of pending pod requests.
    pub request: Resource,
    /// Sum of running pod requests.
    pub allocated: Resource,
    pub deserved: Option<Resource>,
    pub pending_pods: Fifo<PodInfo>,
    pub running_pods: Fifo<PodInfo>,
    pub terminating: Resource,
    pub terminating_pods: Fifo<PodInfo>,
}

impl Consumer {
    pub fn new(metadata: ObjectMeta) -> Self {
        Self {
            metadata,
            request: Resource::empty(),
            allocated: Resource::empty(),
            deserved: None,
            pending_pods: Fifo::new(),
            running_pods: Fifo::new(),
            terminating: Resource::empty(),
            terminating_pods: Fifo::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// How much this consumer is over its deserved share, net of
    /// terminations already in flight. Saturates at zero per axis; empty
    /// until the allocation pass has written `deserved`.
    pub fn reclaim_wanted(&self) -> Resource {
        let Some(deserved) = &self.deserved else {
            return Resource::empty();
        };
        Resource::new(
            (self.allocated.milli_cpu - deserved.milli_cpu - self.terminating.milli_cpu).max(0.0),
            (self.allocated.memory - deserved.memory - self.terminating.memory).max(0.0),
        )
    }

    /// The wire object pushed to the consumer store. `resource_version`
    /// is pinned to "0" to request an unconditional update.
    pub fn to_object(&self) -> ConsumerObject {
        let mut metadata = self.metadata.clone();
        metadata.resource_version = "0".to_string();
        ConsumerObject {
            metadata,
            request: self.request,
            allocated: self.allocated,
            deserved: self.deserved,
        }
    }
}
