// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! botfleet-core: data model and error taxonomy for the bot process supervisor.

pub mod credential;
pub mod error;
pub mod macros;
pub mod workload;

pub use credential::Credential;
pub use error::FleetError;
pub use workload::{validate_name, WorkloadRecord, WorkloadStatus, DEFAULT_ENTRY_POINT};
