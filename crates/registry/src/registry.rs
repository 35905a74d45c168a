// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory registry cache backed by a JSON store on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use botfleet_core::{FleetError, WorkloadRecord};
use parking_lot::Mutex;

/// Durable mapping of workload name → workload record.
///
/// Reads are served from the in-memory cache; every mutation rewrites
/// the full store atomically before returning. One process-wide mutex
/// serializes all access (single-writer discipline); the critical
/// section is never held across a blocking external call, only across
/// the snapshot write itself.
#[derive(Debug)]
pub struct Registry {
    path: PathBuf,
    records: Mutex<BTreeMap<String, WorkloadRecord>>,
}

impl Registry {
    /// Open the registry at `path`, loading any existing store.
    ///
    /// A missing file yields an empty registry. An unreadable or
    /// unparseable file is `ConfigCorrupt`: fail fast rather than
    /// silently discarding fleet state; the operator restores from the
    /// `.bak` snapshot the atomic writes preserve.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FleetError> {
        let path = path.into();
        let records = if path.exists() {
            let corrupt = |reason: String| FleetError::ConfigCorrupt {
                path: path.display().to_string(),
                reason,
            };
            let raw = std::fs::read_to_string(&path).map_err(|e| corrupt(e.to_string()))?;
            serde_json::from_str(&raw).map_err(|e| corrupt(e.to_string()))?
        } else {
            BTreeMap::new()
        };

        tracing::debug!(
            path = %path.display(),
            workloads = records.len(),
            "registry opened"
        );

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// Path of the canonical store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<WorkloadRecord> {
        self.records.lock().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.lock().contains_key(name)
    }

    /// All records, name-ordered.
    pub fn list(&self) -> Vec<WorkloadRecord> {
        self.records.lock().values().cloned().collect()
    }

    /// Insert a brand-new record.
    ///
    /// Fails with `DuplicateName` without mutating anything, in memory
    /// or on disk, if the name is already registered.
    pub fn insert(&self, record: WorkloadRecord) -> Result<(), FleetError> {
        let mut records = self.records.lock();
        if records.contains_key(&record.name) {
            return Err(FleetError::DuplicateName { name: record.name });
        }
        let name = record.name.clone();
        records.insert(name.clone(), record);
        self.flush_or_rollback(&mut records, &name)
    }

    /// Insert or replace a record, persisting the new snapshot.
    pub fn upsert(&self, record: WorkloadRecord) -> Result<(), FleetError> {
        let mut records = self.records.lock();
        let name = record.name.clone();
        let previous = records.insert(name.clone(), record);
        if let Err(e) = self.flush(&records) {
            // Restore the cache so memory and disk stay consistent.
            match previous {
                Some(prev) => records.insert(name, prev),
                None => records.remove(&name),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Remove a record, persisting the new snapshot.
    pub fn remove(&self, name: &str) -> Result<(), FleetError> {
        let mut records = self.records.lock();
        let Some(previous) = records.remove(name) else {
            return Err(FleetError::NotFound {
                name: name.to_string(),
            });
        };
        if let Err(e) = self.flush(&records) {
            records.insert(name.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }

    fn flush(&self, records: &BTreeMap<String, WorkloadRecord>) -> Result<(), FleetError> {
        let json = serde_json::to_vec_pretty(records)
            .map_err(|e| FleetError::Io(std::io::Error::other(e)))?;
        crate::persist::write_atomic(&self.path, &json)?;
        Ok(())
    }

    fn flush_or_rollback(
        &self,
        records: &mut BTreeMap<String, WorkloadRecord>,
        inserted: &str,
    ) -> Result<(), FleetError> {
        if let Err(e) = self.flush(records) {
            records.remove(inserted);
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
