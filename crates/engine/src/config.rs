// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime configuration and state-directory layout.

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the default state directory.
pub const STATE_DIR_ENV_VAR: &str = "BOTFLEET_STATE_DIR";

/// Configuration for the supervisor runtime.
///
/// Everything lives under one state directory:
///
/// ```text
/// <state_dir>/workloads.json   registry store
/// <state_dir>/deployed/<name>  per-workload clone
/// <state_dir>/logs/<name>_<date>.log
/// ```
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub state_dir: PathBuf,
    /// Wait after SIGTERM before escalating to SIGKILL.
    pub grace_period: Duration,
    /// Wait after SIGKILL before reporting the stop as timed out.
    pub kill_wait: Duration,
    pub clone_timeout: Duration,
    pub install_timeout: Duration,
    pub pull_timeout: Duration,
}

impl RuntimeConfig {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            grace_period: Duration::from_secs(5),
            kill_wait: Duration::from_secs(2),
            clone_timeout: Duration::from_secs(120),
            install_timeout: Duration::from_secs(300),
            pull_timeout: Duration::from_secs(60),
        }
    }

    /// Resolve the state directory from `BOTFLEET_STATE_DIR`, falling
    /// back to `~/.botfleet`.
    pub fn from_env() -> Self {
        let state_dir = std::env::var_os(STATE_DIR_ENV_VAR)
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".botfleet")))
            .unwrap_or_else(|| PathBuf::from(".botfleet"));
        Self::new(state_dir)
    }

    pub fn registry_path(&self) -> PathBuf {
        self.state_dir.join("workloads.json")
    }

    pub fn deployments_dir(&self) -> PathBuf {
        self.state_dir.join("deployed")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.state_dir.join("logs")
    }

    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    pub fn kill_wait(mut self, wait: Duration) -> Self {
        self.kill_wait = wait;
        self
    }
}
