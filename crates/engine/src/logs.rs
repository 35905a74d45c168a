// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only per-workload log files.
//!
//! Each workload's combined output goes to one file per calendar day,
//! `<logs_dir>/<name>_<YYYY-MM-DD>.log`. The spawned process holds the
//! file descriptors itself and appends raw lines directly, so capture
//! does not depend on the control plane staying alive; the day in the
//! file name is the day the process was spawned. The collector adds
//! timestamped supervisor notice lines (stop, crash detection) via
//! open-append-close and serves bounded tail reads. Write failures are
//! traced but never propagated; logging must not break supervision.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};

/// Names per-day workload log files and serves bounded tail reads.
pub struct LogCollector {
    logs_dir: PathBuf,
}

impl LogCollector {
    pub fn new(logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            logs_dir: logs_dir.into(),
        }
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    /// Log file for `name` on the given day.
    pub fn log_path(&self, name: &str, date: NaiveDate) -> PathBuf {
        self.logs_dir.join(format!("{name}_{date}.log"))
    }

    /// Today's log file for `name`; the spawn target for its output.
    pub fn current_log_path(&self, name: &str) -> PathBuf {
        self.log_path(name, Utc::now().date_naive())
    }

    /// Append one supervisor notice line to today's log file for `name`.
    ///
    /// Format: `2026-08-30T08:14:09Z [supervisor] message`
    pub fn append(&self, name: &str, label: &str, message: &str) {
        let path = self.log_path(name, Utc::now().date_naive());
        if let Err(e) = self.write_line(&path, label, message) {
            tracing::warn!(workload = %name, error = %e, "failed to write workload log");
        }
    }

    fn write_line(&self, path: &Path, label: &str, message: &str) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let ts = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        writeln!(file, "{ts} [{label}] {message}")
    }

    /// Last `max_lines` lines of the newest log file for `name`,
    /// oldest first. No log file yields an empty vec, not an error.
    pub fn tail(&self, name: &str, max_lines: usize) -> Vec<String> {
        let Some(path) = self.newest_log_file(name) else {
            return Vec::new();
        };
        let Ok(contents) = std::fs::read_to_string(&path) else {
            tracing::warn!(workload = %name, path = %path.display(), "failed to read log file");
            return Vec::new();
        };
        let lines: Vec<&str> = contents.lines().collect();
        let skip = lines.len().saturating_sub(max_lines);
        lines[skip..].iter().map(|l| l.to_string()).collect()
    }

    /// Newest daily file for `name`, by the sortable date in the name.
    fn newest_log_file(&self, name: &str) -> Option<PathBuf> {
        // Names may themselves contain '_', so require the suffix after
        // the prefix to be exactly a date (bot_ must not match bot_extra_).
        let prefix = format!("{name}_");
        let entries = std::fs::read_dir(&self.logs_dir).ok()?;
        entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|f| f.to_str())
                    .and_then(|f| f.strip_prefix(&prefix))
                    .and_then(|rest| rest.strip_suffix(".log"))
                    .is_some_and(|date| date.parse::<NaiveDate>().is_ok())
            })
            .max()
    }
}

#[cfg(test)]
#[path = "logs_tests.rs"]
mod tests;
