// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workload record and status state machine.

use crate::credential::Credential;
use crate::error::FleetError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Entry point launched when none is declared at deploy time.
pub const DEFAULT_ENTRY_POINT: &str = "main.py";

/// Maximum accepted workload name length.
const MAX_NAME_LEN: usize = 64;

/// Observed lifecycle status of a workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadStatus {
    /// Record created, deployment not yet finished
    Pending,
    /// Process confirmed alive at last observation
    Running,
    /// No process; clean state
    Stopped,
    /// Spawn failure or unexpected exit
    Errored,
}

crate::simple_display! {
    WorkloadStatus {
        Pending => "pending",
        Running => "running",
        Stopped => "stopped",
        Errored => "errored",
    }
}

/// One deployed workload: declared configuration plus last-observed state.
///
/// `name` and `source_url` are immutable after creation; changing the
/// source requires remove + redeploy. `pid` is `Some` if and only if
/// `status` is [`WorkloadStatus::Running`] and the process was alive at
/// the last observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadRecord {
    pub name: String,
    pub source_url: String,
    pub credential: Credential,
    pub entry_point: String,
    pub work_dir: PathBuf,
    pub status: WorkloadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl WorkloadRecord {
    /// Create a freshly deployed record in the `stopped` state.
    pub fn new(
        name: impl Into<String>,
        source_url: impl Into<String>,
        credential: Credential,
        entry_point: Option<String>,
        work_dir: PathBuf,
    ) -> Self {
        Self {
            name: name.into(),
            source_url: source_url.into(),
            credential,
            entry_point: entry_point.unwrap_or_else(|| DEFAULT_ENTRY_POINT.to_string()),
            work_dir,
            status: WorkloadStatus::Stopped,
            pid: None,
            created_at: Utc::now(),
            last_started_at: None,
            last_error: None,
        }
    }

    /// Transition to `running` with the given pid.
    pub fn mark_running(&mut self, pid: u32) {
        self.status = WorkloadStatus::Running;
        self.pid = Some(pid);
        self.last_started_at = Some(Utc::now());
        self.last_error = None;
    }

    /// Transition to `stopped`, clearing the pid.
    pub fn mark_stopped(&mut self) {
        self.status = WorkloadStatus::Stopped;
        self.pid = None;
    }

    /// Transition to `errored` with a reason, clearing the pid.
    pub fn mark_errored(&mut self, reason: impl Into<String>) {
        self.status = WorkloadStatus::Errored;
        self.pid = None;
        self.last_error = Some(reason.into());
    }
}

/// Validate a workload name for use as a directory and log-file key.
///
/// Names come from operator input and end up in filesystem paths, so
/// anything outside `[A-Za-z0-9_-]` is rejected.
pub fn validate_name(name: &str) -> Result<(), FleetError> {
    let invalid = |reason: &str| FleetError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("name exceeds 64 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(invalid(
            "only ASCII letters, digits, '-' and '_' are allowed",
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "workload_tests.rs"]
mod tests;
