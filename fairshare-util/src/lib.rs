// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Utility library for fairshare.
//!
//! Provides the ordered-set and queue primitives the arbitrator is built
//! from, plus logging, backoff, and timing helpers.

pub mod backoff;
pub mod fifo;
pub mod flowcontrol;
pub mod logging;
pub mod priority_queue;
pub mod time;
pub mod timed_queue;
