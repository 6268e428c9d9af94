// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Arbitrator configuration.

use std::time::Duration;

/// Tunables for the arbitrator and its control loops.
#[derive(Debug, Clone)]
pub struct ArbiterConfig {
    /// Period of the DRF allocation pass.
    pub allocate_period: Duration,
    /// Period of the reclaim worker.
    pub reclaim_period: Duration,
    /// Cooling-off time between a reclaim request being raised and the
    /// first termination it may cause.
    pub reclaim_cooldown: Duration,
    /// Retry delay for a reclaim request that is still unsatisfied after
    /// a pass.
    pub reclaim_retry_delay: Duration,
    /// Period of the consumer-store poll loop.
    pub consumer_poll_period: Duration,
    /// Successful unbind attempts per second, per fault zone.
    pub eviction_qps: f32,
    /// Periodic resync of all pod scheduling groups.
    pub group_resync_period: Duration,
    /// Re-enqueue delay after a persistent group-status write failure.
    pub group_retry_delay: Duration,
    /// Conflict retries for a single group-status write.
    pub status_update_retries: u32,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            allocate_period: Duration::from_secs(1),
            reclaim_period: Duration::from_secs(1),
            reclaim_cooldown: Duration::from_secs(5),
            reclaim_retry_delay: Duration::from_secs(1),
            consumer_poll_period: Duration::from_secs(1),
            eviction_qps: 0.1,
            group_resync_period: Duration::from_secs(30),
            group_retry_delay: Duration::from_secs(10),
            status_update_retries: 2,
        }
    }
}
