// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! The fair-share arbitrator.
//!
//! Watches nodes, pods, and consumers; periodically computes each
//! consumer's deserved share under Dominant Resource Fairness; reclaims
//! overage by unbinding running pods behind a cooling-off period; and
//! answers the scheduler's read-only admission query.

pub mod admission;
pub mod allocator;
pub mod arbiter;
pub mod cache;
pub mod reclaim;
pub mod types;
