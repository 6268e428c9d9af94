// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! PodSchedulingGroup support: validation rules and the controller that
//! rolls per-pod phase counters up into group status.

pub mod controller;
pub mod validation;
