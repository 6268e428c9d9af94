// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Resource allocation policies.
//!
//! The arbitrator depends only on the [`Allocator`] capability; Dominant
//! Resource Fairness is the one policy shipped today.

use std::collections::HashMap;

use fairshare_common::resource::Resource;
use fairshare_util::fifo::Fifo;
use fairshare_util::priority_queue::{Prioritized, PriorityQueue};

use crate::types::{Consumer, NodeInfo, PodInfo};

/// An allocation policy: writes `deserved` on every consumer from the
/// current nodes and consumer demand.
pub trait Allocator: Send + Sync {
    fn allocate(&self, nodes: &HashMap<String, NodeInfo>, consumers: &mut HashMap<String, Consumer>);
}

/// Dominant Resource Fairness.
///
/// Serves consumers smallest-dominant-share first, one pod request at a
/// time, until no candidate request fits into the remaining capacity.
#[derive(Debug, Default)]
pub struct DrfAllocator;

impl DrfAllocator {
    pub fn new() -> Self {
        Self
    }
}

/// Per-consumer working state for one allocation pass.
struct DrfConsumer {
    name: String,
    /// Outstanding demand; shrinks as pods are committed and is allowed
    /// to go negative for requests served out of the running set.
    request: Resource,
    /// Candidate requests still to consider: running pods first, then
    /// pending, each consumed at most once.
    pods: Fifo<PodInfo>,
    deserved: Resource,
    share: f64,
}

/// Heap key into the working set; the share is snapshotted at push time.
struct ShareKey {
    share: f64,
    name: String,
    index: usize,
}

impl Prioritized for ShareKey {
    fn priority(&self) -> f64 {
        self.share
    }
    fn tie_break(&self) -> &str {
        &self.name
    }
}

impl Allocator for DrfAllocator {
    fn allocate(
        &self,
        nodes: &HashMap<String, NodeInfo>,
        consumers: &mut HashMap<String, Consumer>,
    ) {
        let mut total = Resource::empty();
        for node in nodes.values() {
            total.add(&node.allocatable);
        }
        let mut available = total;

        let mut working = build_working_set(consumers);

        if nodes.is_empty() || working.is_empty() {
            write_back(&working, consumers);
            return;
        }

        loop {
            let mut pq = PriorityQueue::new();
            for (index, consumer) in working.iter().enumerate() {
                pq.push(ShareKey {
                    share: consumer.share,
                    name: consumer.name.clone(),
                    index,
                });
            }

            let mut allocated_once = false;
            loop {
                if available.is_empty() || pq.is_empty() {
                    break;
                }

                let key = pq.pop().expect("non-empty heap");
                let consumer = &mut working[key.index];

                // A consumer with nothing left to ask for drops out of
                // this round.
                let Some(pod) = consumer.pods.pop() else {
                    continue;
                };

                // A request that does not fit is consumed and discarded;
                // the consumer stays in the round so the rest of its pool
                // is still considered.
                if !pod.resource.less_equal(&available) {
                    pq.push(ShareKey {
                        share: consumer.share,
                        name: consumer.name.clone(),
                        index: key.index,
                    });
                    continue;
                }

                consumer.deserved.add(&pod.resource);
                consumer.request.sub(&pod.resource);
                available.sub(&pod.resource);
                consumer.share = dominant_share(consumer, &total);
                allocated_once = true;

                tracing::debug!(
                    consumer = %consumer.name,
                    share = consumer.share,
                    available = %available,
                    "committed request"
                );

                pq.push(ShareKey {
                    share: consumer.share,
                    name: consumer.name.clone(),
                    index: key.index,
                });
            }

            if !allocated_once {
                break;
            }
        }

        write_back(&working, consumers);
    }
}

/// Snapshot each consumer into its working form, in name order so that a
/// given input always allocates identically.
fn build_working_set(consumers: &HashMap<String, Consumer>) -> Vec<DrfConsumer> {
    let mut names: Vec<&String> = consumers.keys().collect();
    names.sort();

    names
        .into_iter()
        .map(|name| {
            let consumer = &consumers[name];
            let mut pods = consumer.running_pods.copy();
            pods.append(&consumer.pending_pods);
            DrfConsumer {
                name: name.clone(),
                request: consumer.request,
                pods,
                deserved: Resource::empty(),
                share: 0.0,
            }
        })
        .collect()
}

fn write_back(working: &[DrfConsumer], consumers: &mut HashMap<String, Consumer>) {
    // Consumers that appeared mid-pass are absent from the working set
    // and keep deserved unset until the next pass.
    for snapshot in working {
        if let Some(consumer) = consumers.get_mut(&snapshot.name) {
            consumer.deserved = Some(snapshot.deserved);
        }
    }
}

/// The consumer's dominant share of `deserved`.
///
/// The dominant axis is picked from the consumer's whole appetite
/// (outstanding request plus what it already got) so the axis stays
/// stable as allocations grow.
fn dominant_share(consumer: &DrfConsumer, total: &Resource) -> f64 {
    let mut all_request = consumer.request;
    all_request.add(&consumer.deserved);

    let cpu_share = axis_share(all_request.milli_cpu, total.milli_cpu);
    let mem_share = axis_share(all_request.memory, total.memory);

    if cpu_share > mem_share {
        return axis_share(consumer.deserved.milli_cpu, total.milli_cpu);
    }
    if cpu_share < mem_share {
        return axis_share(consumer.deserved.memory, total.memory);
    }
    f64::max(
        axis_share(consumer.deserved.milli_cpu, total.milli_cpu),
        axis_share(consumer.deserved.memory, total.memory),
    )
}

fn axis_share(amount: f64, total: f64) -> f64 {
    if total > 0.0 {
        amount / total
    } else {
        0.0
    }
}
