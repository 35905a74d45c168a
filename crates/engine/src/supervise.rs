// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-workload process lifecycle: start, stop, restart, status, remove.
//!
//! `errored` is reachable from spawn failure or an unexpected exit.
//! Crash detection is lazy: `status()` reconciles the declared state
//! against OS-level liveness of the recorded pid. There is no
//! background health loop, an operator query drives detection.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use botfleet_core::credential::CREDENTIAL_ENV_VAR;
use botfleet_core::{FleetError, WorkloadRecord, WorkloadStatus};
use botfleet_registry::Registry;

use crate::config::RuntimeConfig;
use crate::logs::LogCollector;
use crate::runner::{CommandRunner, StopSignal};

/// Poll interval while waiting for a signalled process to exit.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub(crate) struct Supervisor {
    registry: Arc<Registry>,
    runner: Arc<dyn CommandRunner>,
    logs: Arc<LogCollector>,
    grace_period: Duration,
    kill_wait: Duration,
}

impl Supervisor {
    pub(crate) fn new(
        registry: Arc<Registry>,
        runner: Arc<dyn CommandRunner>,
        logs: Arc<LogCollector>,
        config: &RuntimeConfig,
    ) -> Self {
        Self {
            registry,
            runner,
            logs,
            grace_period: config.grace_period,
            kill_wait: config.kill_wait,
        }
    }

    /// Start the workload's process.
    ///
    /// No-op returning the current record if it is already running.
    /// Spawn failure persists `errored` and reports `SpawnFailed`.
    pub(crate) async fn start(&self, name: &str) -> Result<WorkloadRecord, FleetError> {
        let mut record = self.fetch(name)?;
        self.reconcile(&mut record)?;
        if record.status == WorkloadStatus::Running {
            tracing::debug!(workload = name, pid = record.pid, "already running");
            return Ok(record);
        }

        let entry_path = record.work_dir.join(&record.entry_point);
        if !entry_path.is_file() {
            let reason = format!("entry point '{}' missing", record.entry_point);
            record.mark_errored(reason.clone());
            self.registry.upsert(record)?;
            return Err(FleetError::SpawnFailed {
                name: name.to_string(),
                reason,
            });
        }

        let argv = interpreter_argv(&record);
        let env = vec![(
            CREDENTIAL_ENV_VAR.to_string(),
            record.credential.expose().to_string(),
        )];

        let log_file = self.logs.current_log_path(name);
        match self
            .runner
            .spawn(&record.work_dir, &argv, &env, &log_file)
            .await
        {
            Ok(pid) => {
                record.mark_running(pid);
                self.registry.upsert(record.clone())?;
                tracing::info!(workload = name, pid, "workload started");
                Ok(record)
            }
            Err(e) => {
                record.mark_errored(e.to_string());
                self.registry.upsert(record)?;
                Err(FleetError::SpawnFailed {
                    name: name.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Stop the workload's process, converging to `stopped`.
    ///
    /// Idempotent: a workload that is already stopped, or whose process
    /// exited out-of-band, transitions cleanly without signalling.
    /// Escalates SIGTERM → SIGKILL after the grace period; a process
    /// that survives SIGKILL is a `Timeout`.
    pub(crate) async fn stop(&self, name: &str) -> Result<WorkloadRecord, FleetError> {
        let mut record = self.fetch(name)?;

        let Some(pid) = record.pid.filter(|&p| self.runner.is_alive(p)) else {
            if record.status != WorkloadStatus::Stopped {
                record.mark_stopped();
                self.registry.upsert(record.clone())?;
            }
            return Ok(record);
        };

        tracing::info!(workload = name, pid, "stopping workload");
        self.runner.signal(pid, StopSignal::Graceful);
        if !self.wait_for_exit(pid, self.grace_period).await {
            tracing::warn!(workload = name, pid, "grace period expired, escalating to SIGKILL");
            self.runner.signal(pid, StopSignal::Forceful);
            if !self.wait_for_exit(pid, self.kill_wait).await {
                return Err(FleetError::Timeout {
                    name: name.to_string(),
                    operation: "stop".to_string(),
                    secs: (self.grace_period + self.kill_wait).as_secs(),
                });
            }
        }

        record.mark_stopped();
        self.registry.upsert(record.clone())?;
        self.logs.append(name, "supervisor", "process stopped");
        tracing::info!(workload = name, "workload stopped");
        Ok(record)
    }

    /// Stop then start, observed as a single operation.
    ///
    /// A stop that fails to converge reports `RestartFailed` and spawns
    /// nothing; never a new process over a possibly-alive old one.
    pub(crate) async fn restart(&self, name: &str) -> Result<WorkloadRecord, FleetError> {
        if let Err(e) = self.stop(name).await {
            return Err(match e {
                FleetError::NotFound { name } => FleetError::NotFound { name },
                other => FleetError::RestartFailed {
                    name: name.to_string(),
                    reason: other.to_string(),
                },
            });
        }
        self.start(name).await
    }

    /// Current record, reconciled against OS-level liveness.
    ///
    /// A `running` record whose pid is gone transitions to `errored`
    /// (persisted) before being returned. This is the fleet's only
    /// crash-detection mechanism.
    pub(crate) fn status(&self, name: &str) -> Result<WorkloadRecord, FleetError> {
        let mut record = self.fetch(name)?;
        self.reconcile(&mut record)?;
        Ok(record)
    }

    /// Remove the workload entirely: stop, delete the work tree, then
    /// drop the registry entry, in that strict order. A crash
    /// mid-removal leaves a stopped record plus an orphaned directory
    /// rather than a dangling process.
    pub(crate) async fn remove(&self, name: &str) -> Result<(), FleetError> {
        self.stop(name).await?;

        let record = self.fetch(name)?;
        if record.work_dir.exists() {
            std::fs::remove_dir_all(&record.work_dir)?;
        }
        self.registry.remove(name)?;
        tracing::info!(workload = name, "workload removed");
        Ok(())
    }

    fn fetch(&self, name: &str) -> Result<WorkloadRecord, FleetError> {
        self.registry.get(name).ok_or_else(|| FleetError::NotFound {
            name: name.to_string(),
        })
    }

    fn reconcile(&self, record: &mut WorkloadRecord) -> Result<(), FleetError> {
        if record.status != WorkloadStatus::Running {
            return Ok(());
        }
        let alive = record.pid.is_some_and(|pid| self.runner.is_alive(pid));
        if !alive {
            tracing::warn!(workload = %record.name, pid = record.pid, "process exited unexpectedly");
            record.mark_errored("process exited unexpectedly");
            self.registry.upsert(record.clone())?;
            // The exit notice must reach the workload's own log so an
            // operator tailing it sees the process die.
            self.logs
                .append(&record.name, "supervisor", "process exited unexpectedly");
        }
        Ok(())
    }

    async fn wait_for_exit(&self, pid: u32, bound: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + bound;
        loop {
            if !self.runner.is_alive(pid) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(EXIT_POLL_INTERVAL).await;
        }
    }
}

/// Launch argv for a workload's entry point, chosen by extension.
///
/// Python entries prefer the deploy-scoped venv interpreter when one
/// exists; shell scripts go through `sh`; anything else is executed
/// directly from the work tree.
fn interpreter_argv(record: &WorkloadRecord) -> Vec<String> {
    let entry = &record.entry_point;
    if Path::new(entry).extension().is_some_and(|e| e == "py") {
        let venv_python = record.work_dir.join(".venv/bin/python");
        let python = if venv_python.is_file() {
            venv_python.display().to_string()
        } else {
            "python3".to_string()
        };
        vec![python, entry.clone()]
    } else if Path::new(entry).extension().is_some_and(|e| e == "sh") {
        vec!["sh".to_string(), entry.clone()]
    } else {
        vec![format!("./{entry}")]
    }
}

#[cfg(test)]
#[path = "supervise_tests.rs"]
mod tests;
