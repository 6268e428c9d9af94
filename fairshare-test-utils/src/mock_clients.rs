// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Recording fakes for the client traits.
//!
//! Each fake keeps an in-memory object store and records the mutating
//! calls for test inspection. Failures are scripted per key.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use fairshare_client::traits::{ConsumerApi, GroupApi, PodApi};
use fairshare_common::api::{ConsumerList, ConsumerObject, Pod, PodSchedulingGroup};
use fairshare_common::error::{FairshareError, FairshareResult};
use fairshare_common::events::{EventKind, EventRecorder, ObjectRef};
use parking_lot::Mutex;

/// In-memory consumer store recording every update.
#[derive(Clone, Default)]
pub struct FakeConsumerApi {
    consumers: Arc<Mutex<BTreeMap<String, ConsumerObject>>>,
    updates: Arc<Mutex<Vec<ConsumerObject>>>,
}

impl FakeConsumerApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, consumer: ConsumerObject) {
        self.consumers
            .lock()
            .insert(consumer.metadata.name.clone(), consumer);
    }

    pub fn remove(&self, name: &str) {
        self.consumers.lock().remove(name);
    }

    pub fn num_updates(&self) -> usize {
        self.updates.lock().len()
    }

    pub fn last_update_of(&self, name: &str) -> Option<ConsumerObject> {
        self.updates
            .lock()
            .iter()
            .rev()
            .find(|consumer| consumer.metadata.name == name)
            .cloned()
    }
}

#[async_trait::async_trait]
impl ConsumerApi for FakeConsumerApi {
    async fn list(&self) -> FairshareResult<ConsumerList> {
        Ok(ConsumerList {
            items: self.consumers.lock().values().cloned().collect(),
        })
    }

    async fn update(&self, consumer: &ConsumerObject) -> FairshareResult<()> {
        self.updates.lock().push(consumer.clone());
        self.consumers
            .lock()
            .insert(consumer.metadata.name.clone(), consumer.clone());
        Ok(())
    }
}

/// Pod API fake recording unbind calls; selected keys can be scripted to
/// fail with a transient error.
#[derive(Clone, Default)]
pub struct FakePodApi {
    unbinds: Arc<Mutex<Vec<String>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl FakePodApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make unbind of `"namespace/name"` fail until cleared.
    pub fn fail_unbind(&self, key: &str) {
        self.failing.lock().insert(key.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing.lock().clear();
    }

    /// Keys of recorded unbind calls, oldest first.
    pub fn unbound(&self) -> Vec<String> {
        self.unbinds.lock().clone()
    }

    pub fn num_unbinds(&self) -> usize {
        self.unbinds.lock().len()
    }
}

#[async_trait::async_trait]
impl PodApi for FakePodApi {
    async fn unbind(&self, namespace: &str, name: &str) -> FairshareResult<()> {
        let key = format!("{namespace}/{name}");
        if self.failing.lock().contains(&key) {
            return Err(FairshareError::transient(format!(
                "unbind of {key} refused by script"
            )));
        }
        self.unbinds.lock().push(key);
        Ok(())
    }
}

/// Group API fake with a scriptable conflict count on status writes.
#[derive(Clone, Default)]
pub struct FakeGroupApi {
    groups: Arc<Mutex<BTreeMap<String, PodSchedulingGroup>>>,
    pods: Arc<Mutex<Vec<Pod>>>,
    status_writes: Arc<Mutex<Vec<PodSchedulingGroup>>>,
    conflicts_remaining: Arc<Mutex<u32>>,
    list_errors_remaining: Arc<Mutex<u32>>,
}

impl FakeGroupApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_group(&self, group: PodSchedulingGroup) {
        self.groups.lock().insert(group.metadata.key(), group);
    }

    pub fn remove_group(&self, key: &str) {
        self.groups.lock().remove(key);
    }

    pub fn seed_pod(&self, pod: Pod) {
        self.pods.lock().push(pod);
    }

    /// Make the next `n` status writes fail with Conflict.
    pub fn inject_conflicts(&self, n: u32) {
        *self.conflicts_remaining.lock() = n;
    }

    /// Make the next `n` pod lists fail with a transient error.
    pub fn inject_list_errors(&self, n: u32) {
        *self.list_errors_remaining.lock() = n;
    }

    pub fn status_writes(&self) -> Vec<PodSchedulingGroup> {
        self.status_writes.lock().clone()
    }

    pub fn group(&self, key: &str) -> Option<PodSchedulingGroup> {
        self.groups.lock().get(key).cloned()
    }
}

#[async_trait::async_trait]
impl GroupApi for FakeGroupApi {
    async fn get(&self, namespace: &str, name: &str) -> FairshareResult<PodSchedulingGroup> {
        self.groups
            .lock()
            .get(&format!("{namespace}/{name}"))
            .cloned()
            .ok_or_else(|| {
                FairshareError::not_found(format!("podschedulinggroup {namespace}/{name}"))
            })
    }

    async fn list_pods(&self, namespace: &str) -> FairshareResult<Vec<Pod>> {
        {
            let mut errors = self.list_errors_remaining.lock();
            if *errors > 0 {
                *errors -= 1;
                return Err(FairshareError::transient("pod list refused by script"));
            }
        }
        Ok(self
            .pods
            .lock()
            .iter()
            .filter(|pod| pod.metadata.namespace == namespace)
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        group: &PodSchedulingGroup,
    ) -> FairshareResult<PodSchedulingGroup> {
        {
            let mut conflicts = self.conflicts_remaining.lock();
            if *conflicts > 0 {
                *conflicts -= 1;
                return Err(FairshareError::conflict("resource version mismatch"));
            }
        }
        let key = group.metadata.key();
        let mut groups = self.groups.lock();
        let stored = groups
            .get_mut(&key)
            .ok_or_else(|| FairshareError::not_found(format!("podschedulinggroup {key}")))?;
        stored.status = group.status;
        self.status_writes.lock().push(stored.clone());
        Ok(stored.clone())
    }
}

/// Captures recorded events for assertions.
#[derive(Clone, Default)]
pub struct CapturingEventRecorder {
    events: Arc<Mutex<Vec<(ObjectRef, EventKind, String, String)>>>,
}

impl CapturingEventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(ObjectRef, EventKind, String, String)> {
        self.events.lock().clone()
    }

    pub fn reasons(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|(_, _, reason, _)| reason.clone())
            .collect()
    }
}

impl EventRecorder for CapturingEventRecorder {
    fn record(&self, object: &ObjectRef, kind: EventKind, reason: &str, message: &str) {
        self.events
            .lock()
            .push((object.clone(), kind, reason.to_string(), message.to_string()));
    }
}
