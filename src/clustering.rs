//! Content-hash clustering stage: promotes full-hash buckets with two
//! or more members into [`DuplicateGroup`] domain objects. No survivor
//! decisions happen here — that's the job of scoring/decision.

use crate::cancel::CancellationToken;
use crate::model::{DuplicateGroup, DuplicateItem, PipelineRequest};
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Stable, human-debuggable group id: first 12 hex digits of SHA-1 over
/// the digest plus the first three sorted paths.
fn make_group_id(digest: &str, paths: &[PathBuf]) -> String {
    let mut sorted: Vec<&PathBuf> = paths.iter().collect();
    sorted.sort();

    let mut hasher = Sha1::new();
    hasher.update(digest.as_bytes());
    for path in sorted.iter().take(3) {
        hasher.update(path.to_string_lossy().as_bytes());
    }
    let full = hasher.finalize();
    hex::encode(full)[..12].to_string()
}

pub fn to_groups(
    hash_groups: &BTreeMap<String, Vec<PathBuf>>,
    request: &PipelineRequest,
    cancel: &CancellationToken,
) -> Vec<DuplicateGroup> {
    let mut groups = Vec::new();

    for (digest, paths) in hash_groups {
        if cancel.is_cancelled() {
            return Vec::new();
        }
        if paths.len() < 2 {
            continue;
        }

        let group_id = make_group_id(digest, paths);

        let mut items: Vec<DuplicateItem> = paths
            .iter()
            .map(|path| {
                let (size, mtime_ns) = std::fs::metadata(path)
                    .map(|m| {
                        let mtime_ns = m
                            .modified()
                            .ok()
                            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                            .map(|d| d.as_nanos() as i64)
                            .unwrap_or(0);
                        (m.len(), mtime_ns)
                    })
                    .unwrap_or((0, 0));
                let mut item = DuplicateItem::new(path.clone(), size, digest.clone());
                item.mtime_ns = mtime_ns;
                item
            })
            .collect();

        if request.validation_mode {
            items.sort_by(|a, b| a.path.cmp(&b.path));
        }

        if let Some(group) = DuplicateGroup::new(group_id, items) {
            groups.push(group);
        }
    }

    if request.validation_mode {
        groups.sort_by(|a, b| a.group_id.cmp(&b.group_id));
    }

    groups
}

/// Minimal hex encoding helper so clustering doesn't need a direct
/// `hex` crate dependency purely for this one call site.
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}
