//! Cryptographic hashing stages: partial hash then, for survivors, full
//! hash. Both share the same worker-pool machinery.
//!
//! Each hashing task is independent; a per-file I/O failure drops that
//! file from the result but never aborts the stage. In validation mode,
//! results are merged into path-sorted buckets so thread-completion
//! order cannot affect the output.

use crate::cancel::CancellationToken;
use crate::model::PipelineRequest;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

const FULL_HASH_CHUNK_SIZE: usize = 1024 * 1024;

fn worker_count(request: &PipelineRequest) -> usize {
    request
        .max_workers
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
                .min(32)
        })
        .max(1)
}

/// Hash the first `bytes_to_read` bytes of a file, or the whole file
/// when `None`. Reads in fixed-size chunks for the full-file case so
/// large files are never buffered entirely into memory.
fn hash_segment(path: &Path, bytes_to_read: Option<usize>) -> std::io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();

    match bytes_to_read {
        Some(n) => {
            let mut buf = vec![0u8; n];
            let mut total = 0;
            loop {
                let read = reader.read(&mut buf[total..])?;
                if read == 0 {
                    break;
                }
                total += read;
                if total == buf.len() {
                    break;
                }
            }
            hasher.update(&buf[..total]);
        }
        None => {
            let mut buf = [0u8; FULL_HASH_CHUNK_SIZE];
            loop {
                let read = reader.read(&mut buf)?;
                if read == 0 {
                    break;
                }
                hasher.update(&buf[..read]);
            }
        }
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Shared hash-bucketing routine used by both the partial and full
/// hashing stages: hash every candidate path in parallel, bucket by
/// digest, drop singletons.
fn hash_groups<I>(
    groups: I,
    request: &PipelineRequest,
    cancel: &CancellationToken,
    bytes_to_read: Option<usize>,
) -> BTreeMap<String, Vec<PathBuf>>
where
    I: IntoIterator<Item = Vec<PathBuf>>,
{
    let mut candidates: Vec<PathBuf> = Vec::new();
    for mut group in groups {
        if group.len() < 2 {
            continue;
        }
        if request.validation_mode {
            group.sort();
        }
        candidates.extend(group);
    }

    if candidates.is_empty() || cancel.is_cancelled() {
        return BTreeMap::new();
    }

    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count(request))
        .build()
    {
        Ok(pool) => pool,
        Err(_) => return BTreeMap::new(),
    };

    let results: Vec<(PathBuf, String)> = pool.install(|| {
        use rayon::prelude::*;
        candidates
            .par_iter()
            .filter_map(|path| {
                if cancel.is_cancelled() {
                    return None;
                }
                hash_segment(path, bytes_to_read)
                    .ok()
                    .map(|digest| (path.clone(), digest))
            })
            .collect()
    });

    if cancel.is_cancelled() {
        return BTreeMap::new();
    }

    let mut buckets: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for (path, digest) in results {
        buckets.entry(digest).or_default().push(path);
    }
    buckets.retain(|_, paths| paths.len() >= 2);

    if request.validation_mode {
        for paths in buckets.values_mut() {
            paths.sort();
        }
    }

    buckets
}

/// Partial hash: the primary pruning step, over the first
/// `partial_hash_bytes` bytes of each candidate.
pub fn partial_hash(
    size_groups: &BTreeMap<u64, Vec<PathBuf>>,
    request: &PipelineRequest,
    cancel: &CancellationToken,
) -> BTreeMap<String, Vec<PathBuf>> {
    hash_groups(
        size_groups.values().cloned(),
        request,
        cancel,
        Some(request.partial_hash_bytes),
    )
}

/// Full hash: authoritative, over the entire file, for survivors of the
/// partial-hash stage. No-op (returns input paths unchanged as a
/// pass-through) when `request.use_full_hash` is false — callers should
/// check that flag themselves; this function always fully hashes.
pub fn full_hash(
    partial_groups: &BTreeMap<String, Vec<PathBuf>>,
    request: &PipelineRequest,
    cancel: &CancellationToken,
) -> BTreeMap<String, Vec<PathBuf>> {
    hash_groups(partial_groups.values().cloned(), request, cancel, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Mode;
    use std::fs;
    use tempfile::TempDir;

    fn req() -> PipelineRequest {
        PipelineRequest::builder(vec![PathBuf::from("/tmp")])
            .mode(Mode::Scan)
            .build()
    }

    #[test]
    fn hash_segment_matches_known_sha256() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.txt");
        fs::write(&path, b"hello world").unwrap();
        let digest = hash_segment(&path, None).unwrap();
        assert_eq!(
            digest,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn partial_hash_groups_identical_prefixes() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        let c = dir.path().join("c.txt");
        fs::write(&a, b"same content").unwrap();
        fs::write(&b, b"same content").unwrap();
        fs::write(&c, b"different!!!").unwrap();

        let mut size_groups = BTreeMap::new();
        size_groups.insert(12u64, vec![a.clone(), b.clone(), c.clone()]);

        let result = partial_hash(&size_groups, &req(), &CancellationToken::new());
        assert_eq!(result.len(), 1);
        let (_, paths) = result.into_iter().next().unwrap();
        let mut paths = paths;
        paths.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(paths, expected);
    }

    #[test]
    fn full_hash_drops_singletons_after_partial_collision() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        // Same first 4 bytes, different tail: partial hash would
        // collide if partial_hash_bytes were 4, but full hash must not.
        fs::write(&a, b"AAAA1").unwrap();
        fs::write(&b, b"AAAA2").unwrap();

        let mut partial_groups = BTreeMap::new();
        partial_groups.insert("fake".to_string(), vec![a, b]);

        let result = full_hash(&partial_groups, &req(), &CancellationToken::new());
        assert!(result.is_empty());
    }

    #[test]
    fn cancellation_returns_empty_map() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, b"x").unwrap();
        fs::write(&b, b"x").unwrap();
        let mut size_groups = BTreeMap::new();
        size_groups.insert(1u64, vec![a, b]);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = partial_hash(&size_groups, &req(), &cancel);
        assert!(result.is_empty());
    }

    #[test]
    fn explicit_max_workers_above_32_is_not_capped() {
        let req = PipelineRequest::builder(vec![PathBuf::from("/tmp")])
            .max_workers(Some(64))
            .build();
        assert_eq!(worker_count(&req), 64);
    }

    #[test]
    fn default_worker_count_is_capped_at_32() {
        let req = req();
        assert!(req.max_workers.is_none());
        assert!(worker_count(&req) <= 32);
    }

    #[test]
    fn unreadable_file_is_silently_dropped() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.txt");
        let missing = dir.path().join("missing.txt");
        fs::write(&a, b"x").unwrap();

        let mut size_groups = BTreeMap::new();
        size_groups.insert(1u64, vec![a, missing]);

        let result = partial_hash(&size_groups, &req(), &CancellationToken::new());
        // Only one readable file remains -> singleton -> dropped entirely.
        assert!(result.is_empty());
    }
}
