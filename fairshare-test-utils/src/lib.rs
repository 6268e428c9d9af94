// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Shared test helpers for fairshare crates.

pub mod mock_clients;
pub mod wait;

use std::collections::BTreeMap;

use fairshare_common::api::{
    Container, LabelSelector, Node, NodeStatus, ObjectMeta, Pod, PodPhase, PodSchedulingGroup,
    PodSchedulingGroupSpec, PodSpec, PodStatus, ResourceRequests,
};
use fairshare_common::resource::Resource;

/// Initialize tracing for tests.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}

/// A pod with a single container requesting the given resources.
pub fn make_pod(
    namespace: &str,
    name: &str,
    phase: PodPhase,
    cpu_millis: f64,
    memory_bytes: f64,
) -> Pod {
    Pod {
        metadata: ObjectMeta::named(namespace, name),
        spec: PodSpec {
            node_name: String::new(),
            containers: vec![Container {
                name: "main".to_string(),
                requests: ResourceRequests {
                    cpu_millis,
                    memory_bytes,
                },
            }],
            init_containers: Vec::new(),
        },
        status: PodStatus { phase },
    }
}

/// Same as [`make_pod`] with labels attached.
pub fn make_labeled_pod(
    namespace: &str,
    name: &str,
    phase: PodPhase,
    labels: &[(&str, &str)],
) -> Pod {
    let mut pod = make_pod(namespace, name, phase, 100.0, 1024.0);
    pod.metadata.labels = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    pod
}

/// A node with the given allocatable resources (capacity matches).
pub fn make_node(name: &str, cpu_millis: f64, memory_bytes: f64) -> Node {
    let resources = Resource::new(cpu_millis, memory_bytes);
    Node {
        metadata: ObjectMeta::named("", name),
        status: NodeStatus {
            allocatable: resources,
            capacity: resources,
        },
    }
}

/// A scheduling group selecting the given labels.
pub fn make_group(
    namespace: &str,
    name: &str,
    selector: &[(&str, &str)],
    min_available: Option<i32>,
) -> PodSchedulingGroup {
    let match_labels: BTreeMap<String, String> = selector
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    PodSchedulingGroup {
        metadata: ObjectMeta::named(namespace, name),
        spec: PodSchedulingGroupSpec {
            selector: Some(LabelSelector { match_labels }),
            min_available,
            ..Default::default()
        },
        ..Default::default()
    }
}
