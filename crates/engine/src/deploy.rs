// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workload deployment: clone, dependency install, entry-point check.
//!
//! Every failure in the pipeline rolls back the partial work tree so
//! the registry never references a directory that does not exist and no
//! orphaned directory survives a failed deploy.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use botfleet_core::{validate_name, Credential, FleetError, WorkloadRecord, DEFAULT_ENTRY_POINT};
use botfleet_registry::Registry;

use crate::config::RuntimeConfig;
use crate::runner::{CommandRunner, RunnerError};

/// Dependency manifest convention for Python workloads.
const DEPENDENCY_MANIFEST: &str = "requirements.txt";

pub(crate) struct Deployer {
    registry: Arc<Registry>,
    runner: Arc<dyn CommandRunner>,
    deployments_dir: PathBuf,
    clone_timeout: std::time::Duration,
    install_timeout: std::time::Duration,
    pull_timeout: std::time::Duration,
}

impl Deployer {
    pub(crate) fn new(
        registry: Arc<Registry>,
        runner: Arc<dyn CommandRunner>,
        config: &RuntimeConfig,
    ) -> Self {
        Self {
            registry,
            runner,
            deployments_dir: config.deployments_dir(),
            clone_timeout: config.clone_timeout,
            install_timeout: config.install_timeout,
            pull_timeout: config.pull_timeout,
        }
    }

    /// Deploy a new workload from `source_url`.
    ///
    /// On success the record is persisted with `status = stopped`; the
    /// operator starts it explicitly.
    pub(crate) async fn deploy(
        &self,
        name: &str,
        source_url: &str,
        credential: Credential,
        entry_point: Option<String>,
    ) -> Result<WorkloadRecord, FleetError> {
        validate_name(name)?;
        if self.registry.contains(name) {
            return Err(FleetError::DuplicateName {
                name: name.to_string(),
            });
        }

        let work_dir = self.deployments_dir.join(name);
        // A leftover tree from a crashed deploy has no registry record
        // (checked above) and is safe to clear.
        if work_dir.exists() {
            std::fs::remove_dir_all(&work_dir)?;
        }

        if let Err(e) = self.clone_source(name, source_url, &work_dir).await {
            self.cleanup_partial(name, &work_dir);
            return Err(e);
        }

        if let Err(e) = self.install_dependencies(name, &work_dir).await {
            self.cleanup_partial(name, &work_dir);
            return Err(e);
        }

        let entry = entry_point
            .clone()
            .unwrap_or_else(|| DEFAULT_ENTRY_POINT.to_string());
        if !work_dir.join(&entry).is_file() {
            self.cleanup_partial(name, &work_dir);
            return Err(FleetError::EntryPointMissing {
                name: name.to_string(),
                entry_point: entry,
            });
        }

        let record = WorkloadRecord::new(name, source_url, credential, entry_point, work_dir);
        if let Err(e) = self.registry.insert(record.clone()) {
            // Lost a race or failed to persist; either way the tree
            // must not outlive a deploy that reported failure.
            self.cleanup_partial(name, &record.work_dir);
            return Err(e);
        }

        tracing::info!(workload = name, source_url, "deployed workload");
        Ok(record)
    }

    /// Pull the latest source and re-install dependencies.
    ///
    /// Never touches `status`/`pid`; the operator restarts explicitly
    /// to pick up new code.
    pub(crate) async fn update(&self, name: &str) -> Result<WorkloadRecord, FleetError> {
        let record = self.registry.get(name).ok_or_else(|| FleetError::NotFound {
            name: name.to_string(),
        })?;

        let argv = string_argv(&["git", "pull"]);
        let output = self
            .runner
            .run(&record.work_dir, &argv, &[], self.pull_timeout)
            .await
            .map_err(|e| self.map_runner_err(name, "git pull", e))?;
        if !output.success() {
            return Err(FleetError::CloneFailed {
                name: name.to_string(),
                reason: output.failure_reason(),
            });
        }

        self.install_dependencies(name, &record.work_dir).await?;

        tracing::info!(workload = name, "updated workload source");
        Ok(record)
    }

    async fn clone_source(
        &self,
        name: &str,
        source_url: &str,
        work_dir: &Path,
    ) -> Result<(), FleetError> {
        std::fs::create_dir_all(&self.deployments_dir)?;

        let argv = vec![
            "git".to_string(),
            "clone".to_string(),
            source_url.to_string(),
            work_dir.display().to_string(),
        ];
        let output = self
            .runner
            .run(&self.deployments_dir, &argv, &[], self.clone_timeout)
            .await
            .map_err(|e| self.map_runner_err(name, "git clone", e))?;

        if !output.success() {
            return Err(FleetError::CloneFailed {
                name: name.to_string(),
                reason: output.failure_reason(),
            });
        }
        Ok(())
    }

    /// Install declared dependencies into a venv scoped to the work tree.
    ///
    /// No manifest means nothing to install, not an error.
    async fn install_dependencies(&self, name: &str, work_dir: &Path) -> Result<(), FleetError> {
        if !work_dir.join(DEPENDENCY_MANIFEST).is_file() {
            tracing::debug!(workload = name, "no dependency manifest, skipping install");
            return Ok(());
        }

        self.run_install_step(
            name,
            work_dir,
            &string_argv(&["python3", "-m", "venv", ".venv"]),
        )
        .await?;

        let pip = work_dir.join(".venv/bin/pip").display().to_string();
        self.run_install_step(
            name,
            work_dir,
            &[
                pip,
                "install".to_string(),
                "-r".to_string(),
                DEPENDENCY_MANIFEST.to_string(),
            ],
        )
        .await
    }

    async fn run_install_step(
        &self,
        name: &str,
        work_dir: &Path,
        argv: &[String],
    ) -> Result<(), FleetError> {
        let output = self
            .runner
            .run(work_dir, argv, &[], self.install_timeout)
            .await
            .map_err(|e| self.map_runner_err(name, "dependency install", e))?;
        if !output.success() {
            return Err(FleetError::DependencyInstallFailed {
                name: name.to_string(),
                reason: output.failure_reason(),
            });
        }
        Ok(())
    }

    fn map_runner_err(&self, name: &str, operation: &str, err: RunnerError) -> FleetError {
        match err {
            RunnerError::Timeout { secs, .. } => FleetError::Timeout {
                name: name.to_string(),
                operation: operation.to_string(),
                secs,
            },
            RunnerError::Spawn { source, .. } => match operation {
                "git clone" | "git pull" => FleetError::CloneFailed {
                    name: name.to_string(),
                    reason: source.to_string(),
                },
                _ => FleetError::DependencyInstallFailed {
                    name: name.to_string(),
                    reason: source.to_string(),
                },
            },
        }
    }

    fn cleanup_partial(&self, name: &str, work_dir: &Path) {
        if !work_dir.exists() {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(work_dir) {
            tracing::warn!(
                workload = name,
                path = %work_dir.display(),
                error = %e,
                "failed to clean up partial deployment"
            );
        }
    }
}

fn string_argv(argv: &[&str]) -> Vec<String> {
    argv.iter().map(|a| a.to_string()).collect()
}

#[cfg(test)]
#[path = "deploy_tests.rs"]
mod tests;
