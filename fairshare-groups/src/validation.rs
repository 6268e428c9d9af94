// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Validation rules for scheduling API objects.
//!
//! These are the checks the API server's registry strategy applies on
//! create and update; the controller relies on objects having passed them.

use fairshare_common::api::{PodSchedulingGroup, PriorityClass};
use fairshare_common::constants::{
    HIGHEST_USER_DEFINABLE_PRIORITY, SYSTEM_CLUSTER_CRITICAL, SYSTEM_NODE_CRITICAL,
    SYSTEM_PRIORITY_CLASS_PREFIX,
};
use fairshare_common::error::{FairshareError, FairshareResult};

/// Validate a group on create. A nil selector is accepted and matches
/// nothing.
pub fn validate_group(group: &PodSchedulingGroup) -> FairshareResult<()> {
    if group.metadata.name.is_empty() {
        return Err(FairshareError::validation("metadata.name is required"));
    }
    if let Some(min_available) = group.spec.min_available {
        if min_available < 0 {
            return Err(FairshareError::validation(format!(
                "spec.minAvailable must be non-negative, got {min_available}"
            )));
        }
    }
    Ok(())
}

/// Validate an update outside the status subresource: the spec is
/// read-only once created.
pub fn validate_group_update(
    new: &PodSchedulingGroup,
    old: &PodSchedulingGroup,
) -> FairshareResult<()> {
    validate_group(new)?;
    if new.spec != old.spec {
        return Err(FairshareError::validation(
            "spec is immutable; status changes go through the status subresource",
        ));
    }
    Ok(())
}

/// Validate a priority class: the `system-` name prefix and the value
/// range above `HIGHEST_USER_DEFINABLE_PRIORITY` are reserved.
pub fn validate_priority_class(class: &PriorityClass) -> FairshareResult<()> {
    let name = &class.metadata.name;
    if name.is_empty() {
        return Err(FairshareError::validation("metadata.name is required"));
    }

    let is_system_name = name == SYSTEM_CLUSTER_CRITICAL || name == SYSTEM_NODE_CRITICAL;
    if name.starts_with(SYSTEM_PRIORITY_CLASS_PREFIX) && !is_system_name {
        return Err(FairshareError::validation(format!(
            "{name}: the {SYSTEM_PRIORITY_CLASS_PREFIX} prefix is reserved"
        )));
    }
    if class.value > HIGHEST_USER_DEFINABLE_PRIORITY && !is_system_name {
        return Err(FairshareError::validation(format!(
            "value {} is above the highest user-definable priority",
            class.value
        )));
    }
    Ok(())
}
