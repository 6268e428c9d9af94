// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Wire shapes of the orchestrator objects the arbitrator consumes.
//!
//! These mirror the upstream API server's JSON; schema validation and
//! persistence belong to the API server, not this crate.

use std::collections::BTreeMap;

use fairshare_util::fifo::Keyed;
use serde::{Deserialize, Serialize};

use crate::resource::Resource;

/// Standard object metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    pub uid: String,
    pub resource_version: String,
    pub labels: BTreeMap<String, String>,
}

impl ObjectMeta {
    pub fn named(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// The `"namespace/name"` key objects are indexed by.
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Pod lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl Default for PodPhase {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Per-container resource requests. CPU in milli-cores, memory in bytes;
/// quantity strings are resolved upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceRequests {
    pub cpu_millis: f64,
    pub memory_bytes: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Container {
    pub name: String,
    pub requests: ResourceRequests,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PodSpec {
    pub node_name: String,
    pub containers: Vec<Container>,
    pub init_containers: Vec<Container>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodStatus {
    pub phase: PodPhase,
}

/// A pod as delivered by the watch stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pod {
    pub metadata: ObjectMeta,
    pub spec: PodSpec,
    pub status: PodStatus,
}

impl Pod {
    /// Effective resource request: the per-axis maximum of the sum of
    /// container requests and the largest init-container request.
    pub fn resource_request(&self) -> Resource {
        let mut result = Resource::empty();
        for container in &self.spec.containers {
            result.milli_cpu += container.requests.cpu_millis;
            result.memory += container.requests.memory_bytes;
        }
        for container in &self.spec.init_containers {
            if container.requests.cpu_millis > result.milli_cpu {
                result.milli_cpu = container.requests.cpu_millis;
            }
            if container.requests.memory_bytes > result.memory {
                result.memory = container.requests.memory_bytes;
            }
        }
        result
    }
}

/// Node status as reported by the kubelet: total capacity and the portion
/// allocatable to pods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeStatus {
    pub allocatable: Resource,
    pub capacity: Resource,
}

/// A cluster node (cluster-scoped; namespace is empty).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    pub metadata: ObjectMeta,
    pub status: NodeStatus,
}

/// The consumer object as stored in the third-party "consumers" collection.
///
/// `request`/`allocated`/`deserved` are owned by the arbitrator and pushed
/// back with every allocation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerObject {
    pub metadata: ObjectMeta,
    pub request: Resource,
    pub allocated: Resource,
    pub deserved: Option<Resource>,
}

/// A consumer collection response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerList {
    pub items: Vec<ConsumerObject>,
}

impl ConsumerList {
    pub fn from_json(raw: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(raw)
    }
}

/// A label query over pods. Only equality matching is supported; an empty
/// or absent selector matches nothing, never everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelSelector {
    pub match_labels: BTreeMap<String, String>,
}

impl LabelSelector {
    pub fn is_empty(&self) -> bool {
        self.match_labels.is_empty()
    }

    /// Whether every selector pair is present in `labels`. An empty
    /// selector matches nothing.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        !self.is_empty()
            && self
                .match_labels
                .iter()
                .all(|(k, v)| labels.get(k) == Some(v))
    }
}

/// A selector-based grouping of pods for gang scheduling. The controller
/// maintains only the status counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodSchedulingGroup {
    pub metadata: ObjectMeta,
    pub spec: PodSchedulingGroupSpec,
    pub status: PodSchedulingGroupStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PodSchedulingGroupSpec {
    pub selector: Option<LabelSelector>,
    pub priority_class_name: String,
    pub priority: Option<i32>,
    pub min_available: Option<i32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PodSchedulingGroupStatus {
    pub pending: i32,
    pub running: i32,
    pub succeeded: i32,
    pub failed: i32,
    pub replicas: i32,
    pub min_available: i32,
}

impl PodSchedulingGroup {
    /// Whether this group's selector matches the pod's labels.
    pub fn selects(&self, pod: &Pod) -> bool {
        self.spec
            .selector
            .as_ref()
            .is_some_and(|sel| sel.matches(&pod.metadata.labels))
    }
}

/// Maps a priority class name to its integer value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriorityClass {
    pub metadata: ObjectMeta,
    pub value: i32,
    pub global_default: bool,
    pub description: String,
}

/// A single change delivered by a watch stream or synthesized by a poller.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent<T> {
    Added(T),
    Updated { old: T, new: T },
    Deleted(T),
}

impl Keyed for Pod {
    fn key(&self) -> String {
        self.metadata.key()
    }
}

impl Keyed for Node {
    fn key(&self) -> String {
        self.metadata.name.clone()
    }
}

impl Keyed for ConsumerObject {
    fn key(&self) -> String {
        self.metadata.name.clone()
    }
}

impl Keyed for PodSchedulingGroup {
    fn key(&self) -> String {
        self.metadata.key()
    }
}
