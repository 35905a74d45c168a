// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-workload operation locks.
//!
//! All lifecycle operations on the same name are mutually exclusive (a
//! stop must never race a start or an update for one workload) while
//! operations on different names proceed concurrently. The table itself
//! is guarded by a sync mutex held only long enough to clone out the
//! per-name lock handle.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Default)]
pub(crate) struct NameLocks {
    table: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl NameLocks {
    /// Handle to the lock for `name`, creating it on first use.
    ///
    /// The caller awaits the returned mutex outside the table lock so
    /// a long-running operation on one workload never blocks lookups
    /// for another.
    pub(crate) fn for_name(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.table
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone()
    }
}

#[cfg(test)]
#[path = "locks_tests.rs"]
mod tests;
