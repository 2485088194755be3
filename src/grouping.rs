//! Size-grouping stage.
//!
//! Buckets discovered files by exact byte size, dropping singleton
//! buckets. Cheap and aggressive: the point is to shrink the workload
//! before hashing begins.

use crate::cancel::CancellationToken;
use crate::model::{DiscoveredFile, PipelineRequest};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Group files by size; buckets with fewer than two members are
/// dropped. Returned as a `BTreeMap` so validation-mode callers get
/// ascending-key iteration for free; non-validation-mode callers can
/// treat it as an ordinary map.
pub fn group_by_size(
    files: &[DiscoveredFile],
    request: &PipelineRequest,
    cancel: &CancellationToken,
) -> BTreeMap<u64, Vec<PathBuf>> {
    let mut buckets: BTreeMap<u64, Vec<PathBuf>> = BTreeMap::new();

    for file in files {
        if cancel.is_cancelled() {
            return BTreeMap::new();
        }
        buckets.entry(file.size).or_default().push(file.path.clone());
    }

    buckets.retain(|_, paths| paths.len() >= 2);

    if request.validation_mode {
        for paths in buckets.values_mut() {
            paths.sort();
        }
    }

    buckets
}
