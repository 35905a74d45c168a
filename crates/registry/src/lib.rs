// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! botfleet-registry: durable workload registry.
//!
//! The registry is the sole source of truth for declared configuration
//! and last-known status. All mutations are serialized behind one mutex
//! and flushed synchronously to disk before returning, so a crash never
//! loses an acknowledged state transition.

mod persist;
mod registry;

pub use registry::Registry;
