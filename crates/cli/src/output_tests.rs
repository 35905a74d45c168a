// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use botfleet_core::Credential;
use std::path::PathBuf;

fn record(name: &str) -> WorkloadRecord {
    WorkloadRecord::new(
        name,
        "https://example.com/repo.git",
        Credential::new("tok-secret-value"),
        None,
        PathBuf::from("/srv/deployed").join(name),
    )
}

#[test]
fn record_line_includes_pid_when_running() {
    let mut rec = record("alpha");
    rec.mark_running(4242);
    let line = record_line(&rec);
    assert!(line.contains("alpha"));
    assert!(line.contains("running"));
    assert!(line.contains("pid 4242"));
}

#[test]
fn record_line_omits_pid_when_stopped() {
    let line = record_line(&record("alpha"));
    assert_eq!(line, "alpha  stopped");
}

#[test]
fn details_show_last_error_only_when_present() {
    let mut rec = record("alpha");
    assert!(!record_details(&rec).contains("last error"));

    rec.mark_errored("process exited unexpectedly");
    let details = record_details(&rec);
    assert!(details.contains("last error:   process exited unexpectedly"));
}

#[test]
fn table_renders_placeholder_when_empty() {
    assert_eq!(table(&[]), "no workloads deployed\n");
}

#[test]
fn table_pads_names_to_the_longest() {
    let rows = [record("a"), record("much-longer-name")];
    let rendered = table(&rows);
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines.len(), 3);
    // status column starts at the same offset on every row
    let offset = lines[0].find("STATUS").unwrap();
    assert_eq!(&lines[1][offset..offset + 7], "stopped");
    assert_eq!(&lines[2][offset..offset + 7], "stopped");
}

#[test]
fn credential_never_appears_in_any_rendering() {
    let mut rec = record("alpha");
    rec.mark_running(7);
    for rendered in [
        record_line(&rec),
        record_details(&rec),
        table(std::slice::from_ref(&rec)),
    ] {
        assert!(!rendered.contains("tok-secret-value"), "leaked: {rendered}");
    }
}

#[test]
fn stats_line_reports_all_counts() {
    let stats = FleetStats {
        total: 5,
        running: 2,
        stopped: 2,
        errored: 1,
    };
    assert_eq!(
        stats_line(&stats),
        "5 workloads: 2 running, 2 stopped, 1 errored"
    );
}
