// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Shared types for the fairshare arbitrator.
//!
//! Provides the resource algebra, API object shapes, error types,
//! constants, and configuration used by every other crate.

pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod resource;
