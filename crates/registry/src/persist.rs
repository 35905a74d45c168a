// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic store writes with backup rotation.
//!
//! Every write serializes the full record set to a sibling temp file,
//! fsyncs it, and renames it over the canonical store. A concurrent
//! reader observes either the old snapshot or the new one, never a
//! partial write. The previous store is rotated to `.bak` files so the
//! last good snapshot survives an operator-recovery scenario.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups: `.bak`, `.bak.2`, `.bak.3`.
/// The oldest backup is removed when the limit is reached.
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    // Remove the oldest if at capacity
    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }

    // Shift existing backups up by one
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

/// Write `contents` to `path` via temp-file-plus-rename.
///
/// The temp file lives in the same directory as the store so the rename
/// stays on one filesystem. Permissions are restricted to the owning
/// account before the rename makes the file visible.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }

    restrict_permissions(&tmp)?;

    // Keep the previous snapshot around before replacing it.
    if path.exists() {
        let bak = rotate_bak_path(path);
        if let Err(e) = fs::copy(path, &bak) {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to rotate registry backup (best-effort)"
            );
        }
    }

    fs::rename(&tmp, path)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
