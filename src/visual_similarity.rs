//! Visual similarity clustering: perceptual-hash every image, band the
//! hash into four 16-bit candidate buckets, confirm edges by Hamming
//! distance, then connect components with union-find.

use crate::cancel::CancellationToken;
use crate::model::{DuplicateGroup, DuplicateItem, PipelineRequest};
use crate::visual_hash::{compute_visual_hash, hamming_distance, is_image_path, VisualHashSettings};
use sha1::{Digest, Sha1};
use std::path::PathBuf;

/// Map a 0 (loose) .. 100 (strict) matching level onto a Hamming
/// distance threshold over 64-bit hashes.
pub fn threshold_from_level(level: u8) -> u32 {
    let level = level.min(100) as f64;
    let (loose, strict) = (20.0, 4.0);
    (loose - (level / 100.0) * (loose - strict)).round() as u32
}

struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut x = x;
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        if self.rank[ra] < self.rank[rb] {
            self.parent[ra] = rb;
        } else if self.rank[ra] > self.rank[rb] {
            self.parent[rb] = ra;
        } else {
            self.parent[rb] = ra;
            self.rank[ra] += 1;
        }
    }
}

fn make_group_id(paths: &[String], threshold: u32, algorithm: &str) -> String {
    let mut sorted = paths.to_vec();
    sorted.sort();
    let blob = format!("{algorithm}|{threshold}|{}", sorted.join("|"));

    let mut hasher = Sha1::new();
    hasher.update(blob.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    format!("sim_{}", &hex[..12])
}

struct Candidate {
    path: PathBuf,
    size: u64,
    mtime_ns: i64,
    hash: u64,
}

/// Cluster images under `roots`-derived candidate paths into visual
/// similarity groups. `files` should already be filtered to image
/// extensions by the caller's discovery pass, but this also re-checks
/// via [`is_image_path`] so it is safe to pass an unfiltered list.
pub fn cluster_similar(
    files: &[PathBuf],
    request: &PipelineRequest,
    cancel: &CancellationToken,
) -> Vec<DuplicateGroup> {
    let settings = VisualHashSettings {
        bitmap_size: request.bitmap_size,
        algorithm: request.similarity_algorithm,
        orientation_invariant: request.orientation_invariant,
        phash_hash_size: 8,
    };
    let threshold = threshold_from_level(request.matching_level);
    let algorithm_name = match request.similarity_algorithm {
        crate::model::SimilarityAlgorithm::DHash => "dhash",
        crate::model::SimilarityAlgorithm::PHash => "phash",
    };

    let mut candidates: Vec<Candidate> = Vec::new();
    for path in files {
        if cancel.is_cancelled() {
            return Vec::new();
        }
        if !is_image_path(path) {
            continue;
        }
        let meta = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(_) => continue,
        };
        let hash = match compute_visual_hash(path, &settings) {
            Some(h) => h,
            None => continue,
        };
        let mtime_ns = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_nanos() as i64)
            .unwrap_or(0);
        candidates.push(Candidate {
            path: path.clone(),
            size: meta.len(),
            mtime_ns,
            hash,
        });
    }

    if request.validation_mode {
        candidates.sort_by(|a, b| a.path.cmp(&b.path));
    }

    cluster_candidates(candidates, algorithm_name, threshold, cancel, request.validation_mode)
}

fn cluster_candidates(
    candidates: Vec<Candidate>,
    algorithm_name: &str,
    threshold: u32,
    cancel: &CancellationToken,
    validation_mode: bool,
) -> Vec<DuplicateGroup> {
    if candidates.len() < 2 {
        return Vec::new();
    }

    let n = candidates.len();
    let mut uf = UnionFind::new(n);

    let mut buckets: std::collections::HashMap<(u8, u16), Vec<usize>> = std::collections::HashMap::new();
    for (i, c) in candidates.iter().enumerate() {
        for band in 0u8..4 {
            let shifted = (c.hash >> (band as u32 * 16)) & 0xFFFF;
            buckets.entry((band, shifted as u16)).or_default().push(i);
        }
    }

    let mut seen_pairs: std::collections::HashSet<(usize, usize)> = std::collections::HashSet::new();
    for idxs in buckets.values() {
        if cancel.is_cancelled() {
            return Vec::new();
        }
        if idxs.len() < 2 {
            continue;
        }
        for a_i in 0..idxs.len() {
            for b_i in (a_i + 1)..idxs.len() {
                let (a, b) = (idxs[a_i], idxs[b_i]);
                let pair = if a < b { (a, b) } else { (b, a) };
                if !seen_pairs.insert(pair) {
                    continue;
                }
                if hamming_distance(candidates[a].hash, candidates[b].hash) <= threshold {
                    uf.union(a, b);
                }
            }
        }
    }

    let mut components: std::collections::BTreeMap<usize, Vec<usize>> = std::collections::BTreeMap::new();
    for i in 0..n {
        let root = uf.find(i);
        components.entry(root).or_default().push(i);
    }

    let mut groups = Vec::new();
    for members in components.into_values() {
        if members.len() < 2 {
            continue;
        }
        let mut members_sorted = members;
        members_sorted.sort_by_key(|&i| candidates[i].path.to_string_lossy().to_string());

        let paths: Vec<String> = members_sorted
            .iter()
            .map(|&i| candidates[i].path.to_string_lossy().to_string())
            .collect();
        let group_id = make_group_id(&paths, threshold, algorithm_name);

        let items: Vec<DuplicateItem> = members_sorted
            .iter()
            .map(|&i| {
                let c = &candidates[i];
                let mut item = DuplicateItem::new(c.path.clone(), c.size, String::new());
                item.mtime_ns = c.mtime_ns;
                item.perceptual_hash = Some(c.hash);
                item
            })
            .collect();

        if let Some(group) = DuplicateGroup::new(group_id, items) {
            groups.push(group);
        }
    }

    if validation_mode {
        groups.sort_by(|a, b| {
            let a_paths: Vec<_> = a.items.iter().map(|i| i.path.clone()).collect();
            let b_paths: Vec<_> = b.items.iter().map(|i| i.path.clone()).collect();
            (a.group_id.clone(), a_paths).cmp(&(b.group_id.clone(), b_paths))
        });
    }

    groups
}
