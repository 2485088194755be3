//! Filesystem traversal stage.
//!
//! Iterative with an explicit work stack — never recursive. Per-entry
//! I/O errors are swallowed; nothing propagates upward. In validation
//! mode, directory entries are sorted by lowercase name before descent
//! and the final list is sorted by path.

use crate::cancel::CancellationToken;
use crate::model::{DiscoveredFile, FileIdentity, PipelineRequest};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Run discovery across every root in `request`.
pub fn discover(request: &PipelineRequest, cancel: &CancellationToken) -> Vec<DiscoveredFile> {
    let mut out = Vec::new();
    for root in &request.roots {
        if cancel.is_cancelled() {
            break;
        }
        scan_root(root, request, cancel, &mut out);
    }

    if request.validation_mode {
        out.sort_by(|a, b| a.path.cmp(&b.path));
    }
    out
}

fn scan_root(
    root: &Path,
    request: &PipelineRequest,
    cancel: &CancellationToken,
    out: &mut Vec<DiscoveredFile>,
) {
    let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];
    // (device, inode) pairs already descended into — guards against
    // symlink cycles when follow_symlinks is enabled.
    let mut visited_dirs: HashSet<(u64, u64)> = HashSet::new();

    while let Some(dir) = stack.pop() {
        if cancel.is_cancelled() {
            return;
        }

        if request.follow_symlinks {
            if let Ok(ident) = FileIdentity::from_path(&dir, true) {
                if !visited_dirs.insert((ident.device_id, ident.inode)) {
                    continue;
                }
            }
        }

        let mut entries: Vec<std::fs::DirEntry> = match std::fs::read_dir(&dir) {
            Ok(rd) => rd.filter_map(|e| e.ok()).collect(),
            Err(_) => continue,
        };

        if request.validation_mode {
            entries.sort_by(|a, b| {
                a.file_name()
                    .to_string_lossy()
                    .to_lowercase()
                    .cmp(&b.file_name().to_string_lossy().to_lowercase())
            });
        }

        for entry in entries {
            if cancel.is_cancelled() {
                return;
            }

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if !request.include_hidden && name_str.starts_with('.') {
                continue;
            }

            let is_symlink = entry
                .metadata()
                .map(|m| m.file_type().is_symlink())
                .unwrap_or(false);
            if is_symlink && !request.follow_symlinks {
                continue;
            }

            let file_type = match entry.file_type() {
                Ok(ft) => ft,
                Err(_) => continue,
            };

            let is_dir = if file_type.is_symlink() {
                std::fs::metadata(entry.path())
                    .map(|m| m.is_dir())
                    .unwrap_or(false)
            } else {
                file_type.is_dir()
            };

            if is_dir {
                if request.exclude_dirs.contains(name_str.as_ref()) {
                    continue;
                }
                stack.push(entry.path());
                continue;
            }

            let path = entry.path();
            let ext_ok = match &request.allowed_extensions {
                None => true,
                Some(allowed) => path
                    .extension()
                    .map(|e| allowed.contains(&format!(".{}", e.to_string_lossy().to_lowercase())))
                    .unwrap_or(false),
            };
            if !ext_ok {
                continue;
            }

            let meta = match std::fs::metadata(&path) {
                Ok(m) => m,
                Err(_) => continue,
            };
            if !meta.is_file() {
                continue;
            }

            let size = meta.len();
            if size < request.min_size_bytes {
                continue;
            }

            let mtime_ns = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_nanos() as i64)
                .unwrap_or(0);

            out.push(DiscoveredFile {
                path,
                size,
                mtime_ns,
            });
        }
    }
}
