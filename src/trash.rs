//! Reversible deletion via a per-scan-root trash mirror.
//!
//! Non-survivor files move into `<scan_root>/.cerebro_trash/<relative
//! path>` rather than being unlinked outright, with collision
//! disambiguation and a move-log that makes a best-effort undo
//! possible. Files outside `scan_root` land under `_external/` with a
//! sanitized absolute path.

use crate::error::{CerebroError, Result};
use crate::model::DeletePlan;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const TRASH_DIR_NAME: &str = ".cerebro_trash";
pub const TRASH_LOG_FILE_NAME: &str = ".cerebro_trash_log.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrashAction {
    pub moved: Vec<(PathBuf, PathBuf)>,
    #[serde(default)]
    pub failures: Vec<(PathBuf, String)>,
}

/// Persist the move-log next to the trash mirror so `undo` can replay
/// it from a fresh process after the one that performed the move has
/// exited.
pub fn write_trash_log(trash_root: &Path, action: &TrashAction) -> Result<PathBuf> {
    let log_path = trash_root.join(TRASH_LOG_FILE_NAME);
    let json = serde_json::to_string_pretty(action)?;
    std::fs::write(&log_path, json).map_err(|source| CerebroError::ReportWrite {
        path: log_path.clone(),
        source,
    })?;
    Ok(log_path)
}

/// Read back a previously-written move-log.
pub fn read_trash_log(trash_root: &Path) -> Result<TrashAction> {
    let log_path = trash_root.join(TRASH_LOG_FILE_NAME);
    let content = std::fs::read_to_string(&log_path).map_err(|source| CerebroError::ReportWrite {
        path: log_path.clone(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

fn safe_relpath(path: &Path, scan_root: &Path) -> PathBuf {
    match path.strip_prefix(scan_root) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => {
            let sanitized = path.to_string_lossy().replace(':', "");
            let trimmed = sanitized.trim_start_matches(['/', '\\']);
            Path::new("_external").join(trimmed)
        }
    }
}

fn dedupe_path(path: PathBuf) -> std::io::Result<PathBuf> {
    if !path.exists() {
        return Ok(path);
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let suffix = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let parent = path.parent().unwrap_or_else(|| Path::new(""));

    for i in 1..10_000 {
        let candidate = parent.join(format!("{stem}__{i}{suffix}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(std::io::Error::other("could not dedupe trash path"))
}

/// Same-filesystem rename is atomic; fall back to copy-then-unlink
/// across filesystem boundaries.
fn relocate(src: &Path, dst: &Path) -> std::io::Result<()> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }
    match std::fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(_) => {
            std::fs::copy(src, dst)?;
            std::fs::remove_file(src)?;
            Ok(())
        }
    }
}

/// Move every non-survivor item in `plan` into the trash mirror under
/// `scan_root`. Items that no longer exist on disk are silently
/// skipped (already gone is not a failure). A failure relocating one
/// item is recorded and does not stop the rest of the batch; every
/// item that did succeed beforehand stays recorded in the returned
/// action so `undo` can still reverse them.
pub fn move_duplicates(plan: &DeletePlan, scan_root: &Path) -> std::io::Result<TrashAction> {
    let trash_root = scan_root.join(TRASH_DIR_NAME);
    std::fs::create_dir_all(&trash_root)?;

    let mut moved = Vec::new();
    let mut failures = Vec::new();

    for item in plan.delete_candidates() {
        let src = &item.path;
        if !src.exists() {
            continue;
        }

        let rel = safe_relpath(src, scan_root);
        let dst = match dedupe_path(trash_root.join(rel)) {
            Ok(dst) => dst,
            Err(e) => {
                failures.push((src.clone(), e.to_string()));
                continue;
            }
        };

        match relocate(src, &dst) {
            Ok(()) => moved.push((src.clone(), dst)),
            Err(e) => failures.push((src.clone(), e.to_string())),
        }
    }

    Ok(TrashAction { moved, failures })
}

/// Best-effort reverse-order undo. Returns `false` if any move failed
/// to reverse (some files may have been restored regardless).
pub fn undo(action: &TrashAction) -> bool {
    if action.moved.is_empty() {
        return false;
    }

    let mut ok = true;
    for (src, dst) in action.moved.iter().rev() {
        if !dst.exists() {
            continue;
        }
        if let Some(parent) = src.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                ok = false;
                continue;
            }
        }
        if relocate(dst, src).is_err() {
            ok = false;
        }
    }
    ok
}
