// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Async traits for the external APIs.
//!
//! Implemented by the real transports outside this repository and by the
//! recording fakes in `fairshare-test-utils`.

use fairshare_common::api::{ConsumerList, ConsumerObject, Pod, PodSchedulingGroup};
use fairshare_common::error::FairshareResult;

/// The third-party "consumers" collection.
#[async_trait::async_trait]
pub trait ConsumerApi: Send + Sync {
    /// GET the whole collection.
    async fn list(&self) -> FairshareResult<ConsumerList>;

    /// PUT one consumer unconditionally. The adapter stamps
    /// `resource_version = "0"` before the write.
    async fn update(&self, consumer: &ConsumerObject) -> FairshareResult<()>;
}

/// The pod API, as far as the arbitrator needs it.
#[async_trait::async_trait]
pub trait PodApi: Send + Sync {
    /// Unbind a pod from its node (DELETE of the pod object).
    async fn unbind(&self, namespace: &str, name: &str) -> FairshareResult<()>;
}

/// The PodSchedulingGroup API used by the status controller.
#[async_trait::async_trait]
pub trait GroupApi: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> FairshareResult<PodSchedulingGroup>;

    /// All pods in a namespace; the controller applies the selector.
    async fn list_pods(&self, namespace: &str) -> FairshareResult<Vec<Pod>>;

    /// Write the status subresource. Returns the stored object.
    async fn update_status(
        &self,
        group: &PodSchedulingGroup,
    ) -> FairshareResult<PodSchedulingGroup>;
}
