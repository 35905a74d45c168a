// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

#[test]
fn write_atomic_creates_parent_dirs() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/state/workloads.json");

    write_atomic(&path, b"{}").unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
}

#[test]
fn write_atomic_leaves_no_tmp_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("workloads.json");

    write_atomic(&path, b"first").unwrap();
    write_atomic(&path, b"second").unwrap();

    assert!(!path.with_extension("tmp").exists());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
}

#[test]
fn rotate_bak_shifts_existing_backups() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("workloads.json");

    std::fs::write(path.with_extension("bak"), "oldest").unwrap();
    let next = rotate_bak_path(&path);

    assert_eq!(next, path.with_extension("bak"));
    assert_eq!(
        std::fs::read_to_string(path.with_extension("bak.2")).unwrap(),
        "oldest"
    );
}

#[test]
fn rotate_bak_caps_backup_count() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("workloads.json");

    for i in 0..6 {
        write_atomic(&path, format!("gen{i}").as_bytes()).unwrap();
    }

    assert!(path.with_extension("bak").exists());
    assert!(path.with_extension("bak.2").exists());
    assert!(path.with_extension("bak.3").exists());
    assert!(!path.with_extension("bak.4").exists());
}
