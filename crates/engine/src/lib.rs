// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! botfleet-engine: deployment and process supervision for bot workloads.
//!
//! The [`Runtime`] facade exposes the control-plane command surface
//! (deploy, start, stop, restart, update, remove, status, list, logs).
//! Internally it composes a deployer, a process supervisor, and a
//! [`LogCollector`], all driving the shared registry. External
//! commands and process spawning go through the [`CommandRunner`] trait
//! so tests substitute a fake without touching real processes.

mod config;
mod deploy;
mod locks;
mod logs;
mod runner;
mod runtime;
mod supervise;

pub use config::RuntimeConfig;
pub use logs::LogCollector;
pub use runner::{CommandRunner, RunOutput, RunnerError, StopSignal, SystemRunner};
pub use runtime::{FleetStats, Runtime};

#[cfg(any(test, feature = "test-support"))]
pub use runner::fake::FakeRunner;
