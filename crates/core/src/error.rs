// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the control-plane command surface.
//!
//! Every workload-scoped failure carries the `name` it concerns so the
//! controller can relay an actionable message. [`FleetError::ConfigCorrupt`]
//! is control-plane-fatal; everything else is scoped to one workload and
//! leaves the rest of the fleet serviceable.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FleetError {
    #[error("workload '{name}' already exists")]
    DuplicateName { name: String },

    #[error("workload '{name}' not found")]
    NotFound { name: String },

    #[error("invalid workload name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("clone failed for '{name}': {reason}")]
    CloneFailed { name: String, reason: String },

    #[error("dependency install failed for '{name}': {reason}")]
    DependencyInstallFailed { name: String, reason: String },

    #[error("entry point '{entry_point}' not found in workload '{name}'")]
    EntryPointMissing { name: String, entry_point: String },

    #[error("failed to spawn workload '{name}': {reason}")]
    SpawnFailed { name: String, reason: String },

    #[error("restart failed for '{name}': {reason}")]
    RestartFailed { name: String, reason: String },

    #[error("{operation} timed out for '{name}' after {secs}s")]
    Timeout {
        name: String,
        operation: String,
        secs: u64,
    },

    #[error("registry store corrupt at {path}: {reason}")]
    ConfigCorrupt { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FleetError {
    /// The workload name this failure concerns, if any.
    pub fn workload(&self) -> Option<&str> {
        match self {
            FleetError::DuplicateName { name }
            | FleetError::NotFound { name }
            | FleetError::InvalidName { name, .. }
            | FleetError::CloneFailed { name, .. }
            | FleetError::DependencyInstallFailed { name, .. }
            | FleetError::EntryPointMissing { name, .. }
            | FleetError::SpawnFailed { name, .. }
            | FleetError::RestartFailed { name, .. }
            | FleetError::Timeout { name, .. } => Some(name),
            FleetError::ConfigCorrupt { .. } | FleetError::Io(_) => None,
        }
    }

    /// True for failures that invalidate the whole control plane.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FleetError::ConfigCorrupt { .. })
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
