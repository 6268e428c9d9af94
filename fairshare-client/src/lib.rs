// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Client seams between the arbitrator and the orchestrator APIs.
//!
//! The real transports (HTTP JSON for the consumer store, watch streams
//! for pods and nodes) live outside this repository; this crate defines
//! the async traits they implement, the event-source abstraction that
//! replaces shared informers, and the poll-diff adapter for the consumer
//! collection.

pub mod consumer_poller;
pub mod source;
pub mod traits;
