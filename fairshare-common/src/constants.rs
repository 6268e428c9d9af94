// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Cluster-wide constants.

/// Below this many milli-CPUs a resource vector counts as CPU-empty.
pub const MIN_MILLI_CPU: f64 = 10.0;

/// Below this many bytes a resource vector counts as memory-empty (10 MiB).
pub const MIN_MEMORY: f64 = 10.0 * 1024.0 * 1024.0;

/// Fault zone used when a node carries no zone information.
pub const DEFAULT_FAULT_ZONE: &str = "";

/// Burst size for every eviction rate limiter.
pub const EVICTION_RATE_LIMITER_BURST: u32 = 1;

/// Priority assigned to pods without a priority class when no class is
/// marked as the global default.
pub const DEFAULT_PRIORITY_WHEN_NO_DEFAULT_CLASS_EXISTS: i32 = 0;

/// The highest priority value a user-defined priority class may carry.
/// Values above it are reserved for system use.
pub const HIGHEST_USER_DEFINABLE_PRIORITY: i32 = 1_000_000_000;

/// Start of the priority range reserved for critical system components.
pub const SYSTEM_CRITICAL_PRIORITY: i32 = 2 * HIGHEST_USER_DEFINABLE_PRIORITY;

/// Prefix reserved for system priority class names.
pub const SYSTEM_PRIORITY_CLASS_PREFIX: &str = "system-";

/// Priority class name for cluster-critical system pods.
pub const SYSTEM_CLUSTER_CRITICAL: &str = "system-cluster-critical";

/// Priority class name for node-critical system pods.
pub const SYSTEM_NODE_CRITICAL: &str = "system-node-critical";
