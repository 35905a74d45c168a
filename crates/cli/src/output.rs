// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain-text rendering of workload records for the terminal.
//!
//! Credentials are never rendered here; the record's secret stays out of
//! every format in this module.

use botfleet_core::WorkloadRecord;
use botfleet_engine::FleetStats;

/// One-line summary: `name  status  pid`.
pub fn record_line(record: &WorkloadRecord) -> String {
    match record.pid {
        Some(pid) => format!("{}  {}  pid {pid}", record.name, record.status),
        None => format!("{}  {}", record.name, record.status),
    }
}

/// Multi-line detail view for `status`.
pub fn record_details(record: &WorkloadRecord) -> String {
    let mut out = String::new();
    out.push_str(&format!("name:         {}\n", record.name));
    out.push_str(&format!("status:       {}\n", record.status));
    out.push_str(&format!(
        "pid:          {}\n",
        record
            .pid
            .map_or_else(|| "-".to_string(), |pid| pid.to_string())
    ));
    out.push_str(&format!("source:       {}\n", record.source_url));
    out.push_str(&format!("entry point:  {}\n", record.entry_point));
    out.push_str(&format!("work dir:     {}\n", record.work_dir.display()));
    out.push_str(&format!(
        "created:      {}\n",
        record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(started) = record.last_started_at {
        out.push_str(&format!(
            "last started: {}\n",
            started.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    if let Some(error) = &record.last_error {
        out.push_str(&format!("last error:   {error}\n"));
    }
    out
}

/// Aligned table for `list`. Empty registries render a placeholder line.
pub fn table(records: &[WorkloadRecord]) -> String {
    if records.is_empty() {
        return "no workloads deployed\n".to_string();
    }
    let name_width = records
        .iter()
        .map(|r| r.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());
    let mut out = format!("{:name_width$}  {:8}  {:8}  SOURCE\n", "NAME", "STATUS", "PID");
    for record in records {
        let pid = record
            .pid
            .map_or_else(|| "-".to_string(), |pid| pid.to_string());
        out.push_str(&format!(
            "{:name_width$}  {:8}  {pid:8}  {}\n",
            record.name,
            record.status.to_string(),
            record.source_url,
        ));
    }
    out
}

pub fn stats_line(stats: &FleetStats) -> String {
    format!(
        "{} workloads: {} running, {} stopped, {} errored",
        stats.total, stats.running, stats.stopped, stats.errored
    )
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
