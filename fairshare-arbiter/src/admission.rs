// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! The admission query: may a pending pod run under its consumer's
//! deserved cap?

use fairshare_util::fifo::Keyed;

use crate::arbiter::Arbiter;
use crate::cache::ClusterState;
use crate::types::PodInfo;

/// Read-only fit check against the current cache state.
///
/// Denies when the consumer is unknown or the arbitrator has not produced
/// a `deserved` value yet. The comparison is exact: exceeding the cap on
/// either axis fails, ties pass.
pub fn allocatable(state: &ClusterState, pod: &PodInfo) -> bool {
    let Some(consumer) = state.consumers.get(&pod.consumer_name) else {
        tracing::debug!(
            pod = %pod.key(),
            consumer = %pod.consumer_name,
            "admission denied: unknown consumer"
        );
        return false;
    };

    let Some(deserved) = &consumer.deserved else {
        tracing::debug!(pod = %pod.key(), "admission denied: waiting for allocation");
        return false;
    };
    let allocated = &consumer.allocated;

    if pod.resource.memory + allocated.memory > deserved.memory {
        tracing::debug!(
            pod = %pod.key(),
            requested = pod.resource.memory,
            allocated = allocated.memory,
            deserved = deserved.memory,
            "admission denied on memory"
        );
        return false;
    }

    if pod.resource.milli_cpu + allocated.milli_cpu > deserved.milli_cpu {
        tracing::debug!(
            pod = %pod.key(),
            requested = pod.resource.milli_cpu,
            allocated = allocated.milli_cpu,
            deserved = deserved.milli_cpu,
            "admission denied on cpu"
        );
        return false;
    }

    true
}

impl Arbiter {
    /// See [`allocatable`]. Holds the cache lock for the duration of the
    /// check.
    pub fn allocatable(&self, pod: &PodInfo) -> bool {
        allocatable(&self.state().lock(), pod)
    }
}
