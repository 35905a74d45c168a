// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-plane facade composing deployer, supervisor, and log collector.

use std::sync::Arc;

use botfleet_core::{Credential, FleetError, WorkloadRecord, WorkloadStatus};
use botfleet_registry::Registry;

use crate::config::RuntimeConfig;
use crate::deploy::Deployer;
use crate::locks::NameLocks;
use crate::logs::LogCollector;
use crate::runner::{CommandRunner, SystemRunner};
use crate::supervise::Supervisor;

/// Fleet-wide status counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FleetStats {
    pub total: usize,
    pub running: usize,
    pub stopped: usize,
    pub errored: usize,
}

/// The bot process supervisor's command surface.
///
/// Every operation is synchronous from the caller's perspective;
/// deploy and update block on network and installer I/O, so callers
/// must not assume sub-second latency. Operations on the same workload
/// name are serialized; different names proceed concurrently.
pub struct Runtime {
    registry: Arc<Registry>,
    deployer: Deployer,
    supervisor: Supervisor,
    logs: Arc<LogCollector>,
    locks: NameLocks,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime").finish_non_exhaustive()
    }
}

impl Runtime {
    /// Open the runtime with the real system runner.
    ///
    /// Fails fast with `ConfigCorrupt` if the registry store cannot be
    /// parsed; every other guarantee depends on it.
    pub fn new(config: RuntimeConfig) -> Result<Self, FleetError> {
        Self::with_runner(config, Arc::new(SystemRunner))
    }

    /// Open the runtime with a caller-supplied [`CommandRunner`].
    pub fn with_runner(
        config: RuntimeConfig,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self, FleetError> {
        std::fs::create_dir_all(config.deployments_dir())?;
        std::fs::create_dir_all(config.logs_dir())?;

        let registry = Arc::new(Registry::open(config.registry_path())?);
        let logs = Arc::new(LogCollector::new(config.logs_dir()));
        let deployer = Deployer::new(Arc::clone(&registry), Arc::clone(&runner), &config);
        let supervisor = Supervisor::new(
            Arc::clone(&registry),
            Arc::clone(&runner),
            Arc::clone(&logs),
            &config,
        );

        let runtime = Self {
            registry,
            deployer,
            supervisor,
            logs,
            locks: NameLocks::default(),
        };
        runtime.reconcile_startup(runner.as_ref());
        Ok(runtime)
    }

    /// Correct records left `running` by a previous control-plane death.
    ///
    /// Workload processes outlive the control plane, so a live pid is
    /// left untouched; only vanished processes are marked errored.
    fn reconcile_startup(&self, runner: &dyn CommandRunner) {
        for record in self.registry.list() {
            if record.status != WorkloadStatus::Running {
                continue;
            }
            let alive = record.pid.is_some_and(|pid| runner.is_alive(pid));
            if alive {
                continue;
            }
            tracing::warn!(
                workload = %record.name,
                pid = record.pid,
                "recorded process gone at startup, marking errored"
            );
            let mut corrected = record;
            corrected.mark_errored("process exited unexpectedly");
            self.logs
                .append(&corrected.name, "supervisor", "process exited unexpectedly");
            if let Err(e) = self.registry.upsert(corrected) {
                tracing::error!(error = %e, "failed to persist startup reconciliation");
            }
        }
    }

    pub async fn deploy(
        &self,
        name: &str,
        source_url: &str,
        credential: Credential,
        entry_point: Option<String>,
    ) -> Result<WorkloadRecord, FleetError> {
        botfleet_core::validate_name(name)?;
        let lock = self.locks.for_name(name);
        let _guard = lock.lock().await;
        self.deployer
            .deploy(name, source_url, credential, entry_point)
            .await
    }

    pub async fn update(&self, name: &str) -> Result<WorkloadRecord, FleetError> {
        let lock = self.locks.for_name(name);
        let _guard = lock.lock().await;
        self.deployer.update(name).await
    }

    pub async fn start(&self, name: &str) -> Result<WorkloadRecord, FleetError> {
        let lock = self.locks.for_name(name);
        let _guard = lock.lock().await;
        self.supervisor.start(name).await
    }

    pub async fn stop(&self, name: &str) -> Result<WorkloadRecord, FleetError> {
        let lock = self.locks.for_name(name);
        let _guard = lock.lock().await;
        self.supervisor.stop(name).await
    }

    pub async fn restart(&self, name: &str) -> Result<WorkloadRecord, FleetError> {
        let lock = self.locks.for_name(name);
        let _guard = lock.lock().await;
        self.supervisor.restart(name).await
    }

    pub async fn remove(&self, name: &str) -> Result<(), FleetError> {
        let lock = self.locks.for_name(name);
        let _guard = lock.lock().await;
        self.supervisor.remove(name).await
    }

    pub async fn status(&self, name: &str) -> Result<WorkloadRecord, FleetError> {
        let lock = self.locks.for_name(name);
        let _guard = lock.lock().await;
        self.supervisor.status(name)
    }

    /// All records, name-ordered. Statuses are as last observed; use
    /// [`Runtime::status`] for a reconciled view of one workload.
    pub fn list(&self) -> Vec<WorkloadRecord> {
        self.registry.list()
    }

    /// Last `max_lines` lines of the workload's newest log, oldest first.
    pub async fn tail_logs(&self, name: &str, max_lines: usize) -> Result<Vec<String>, FleetError> {
        if !self.registry.contains(name) {
            return Err(FleetError::NotFound {
                name: name.to_string(),
            });
        }
        Ok(self.logs.tail(name, max_lines))
    }

    pub fn stats(&self) -> FleetStats {
        let records = self.registry.list();
        let mut stats = FleetStats {
            total: records.len(),
            running: 0,
            stopped: 0,
            errored: 0,
        };
        for record in &records {
            match record.status {
                WorkloadStatus::Running => stats.running += 1,
                WorkloadStatus::Errored => stats.errored += 1,
                WorkloadStatus::Stopped | WorkloadStatus::Pending => stats.stopped += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
