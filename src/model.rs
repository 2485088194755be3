//! Core data model shared by every pipeline stage.
//!
//! `PipelineRequest` is the single explicit configuration record callers
//! build once and the pipeline consumes without mutation: every
//! recognized field is a named, typed attribute here rather than a
//! loosely-typed options bag.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// What the pipeline should do with the files it finds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Scan,
    Delete,
    Similar,
}

/// What happens to a non-survivor item during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionPolicy {
    MoveToTrash,
    DeletePermanently,
    #[default]
    DryRun,
}

/// Which perceptual-hash algorithm `VisualSimilarity` should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityAlgorithm {
    DHash,
    #[default]
    PHash,
}

/// Immutable configuration for a single pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub roots: Vec<PathBuf>,
    pub mode: Mode,
    pub min_size_bytes: u64,
    pub partial_hash_bytes: usize,
    pub use_full_hash: bool,
    pub max_workers: Option<usize>,
    pub follow_symlinks: bool,
    pub include_hidden: bool,
    pub allow_hardlink_deletes: bool,
    pub allowed_extensions: Option<HashSet<String>>,
    pub exclude_dirs: HashSet<String>,
    pub validation_mode: bool,
    pub deletion_policy: DeletionPolicy,
    pub confirmation_token: Option<String>,
    pub scan_intent: String,
    pub matching_level: u8,
    pub bitmap_size: u32,
    pub similarity_algorithm: SimilarityAlgorithm,
    pub orientation_invariant: bool,
}

/// Default partial-hash prefix length: 64 KiB.
pub const DEFAULT_PARTIAL_HASH_BYTES: usize = 65_536;

impl PipelineRequest {
    /// Start building a request for the given roots. At least one root
    /// is required; everything else takes a sensible default.
    pub fn builder(roots: Vec<PathBuf>) -> PipelineRequestBuilder {
        PipelineRequestBuilder::new(roots)
    }
}

/// Builder for [`PipelineRequest`], mirroring the fluent builders used
/// elsewhere in the pack for multi-field configuration objects.
#[derive(Debug, Clone)]
pub struct PipelineRequestBuilder {
    request: PipelineRequest,
}

impl PipelineRequestBuilder {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            request: PipelineRequest {
                roots,
                mode: Mode::default(),
                min_size_bytes: 0,
                partial_hash_bytes: DEFAULT_PARTIAL_HASH_BYTES,
                use_full_hash: true,
                max_workers: None,
                follow_symlinks: false,
                include_hidden: false,
                allow_hardlink_deletes: false,
                allowed_extensions: None,
                exclude_dirs: HashSet::new(),
                validation_mode: false,
                deletion_policy: DeletionPolicy::default(),
                confirmation_token: None,
                scan_intent: String::new(),
                matching_level: 60,
                bitmap_size: 64,
                similarity_algorithm: SimilarityAlgorithm::default(),
                orientation_invariant: true,
            },
        }
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.request.mode = mode;
        self
    }

    pub fn min_size_bytes(mut self, v: u64) -> Self {
        self.request.min_size_bytes = v;
        self
    }

    pub fn partial_hash_bytes(mut self, v: usize) -> Self {
        self.request.partial_hash_bytes = v;
        self
    }

    pub fn use_full_hash(mut self, v: bool) -> Self {
        self.request.use_full_hash = v;
        self
    }

    pub fn max_workers(mut self, v: Option<usize>) -> Self {
        self.request.max_workers = v;
        self
    }

    pub fn follow_symlinks(mut self, v: bool) -> Self {
        self.request.follow_symlinks = v;
        self
    }

    pub fn include_hidden(mut self, v: bool) -> Self {
        self.request.include_hidden = v;
        self
    }

    pub fn allow_hardlink_deletes(mut self, v: bool) -> Self {
        self.request.allow_hardlink_deletes = v;
        self
    }

    pub fn allowed_extensions(mut self, v: Option<HashSet<String>>) -> Self {
        self.request.allowed_extensions = v.map(|set| {
            set.into_iter()
                .map(|e| e.to_ascii_lowercase())
                .collect()
        });
        self
    }

    pub fn exclude_dirs(mut self, v: HashSet<String>) -> Self {
        self.request.exclude_dirs = v;
        self
    }

    pub fn validation_mode(mut self, v: bool) -> Self {
        self.request.validation_mode = v;
        self
    }

    pub fn deletion_policy(mut self, v: DeletionPolicy) -> Self {
        self.request.deletion_policy = v;
        self
    }

    pub fn confirmation_token(mut self, v: Option<String>) -> Self {
        self.request.confirmation_token = v;
        self
    }

    pub fn scan_intent(mut self, v: impl Into<String>) -> Self {
        self.request.scan_intent = v.into();
        self
    }

    pub fn matching_level(mut self, v: u8) -> Self {
        self.request.matching_level = v.min(100);
        self
    }

    pub fn bitmap_size(mut self, v: u32) -> Self {
        self.request.bitmap_size = v;
        self
    }

    pub fn similarity_algorithm(mut self, v: SimilarityAlgorithm) -> Self {
        self.request.similarity_algorithm = v;
        self
    }

    pub fn orientation_invariant(mut self, v: bool) -> Self {
        self.request.orientation_invariant = v;
        self
    }

    pub fn build(self) -> PipelineRequest {
        self.request
    }
}

/// A file found during discovery, before any hashing has happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub size: u64,
    /// Last-modification time, nanoseconds since the Unix epoch.
    pub mtime_ns: i64,
}

/// One file inside a [`DuplicateGroup`], decorated with hash and score
/// once those stages have run.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateItem {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub content_hash: String,
    pub perceptual_hash: Option<u64>,
    pub mtime_ns: i64,
    pub score: f64,
    pub label: Option<String>,
}

impl DuplicateItem {
    pub fn new(path: PathBuf, size_bytes: u64, content_hash: String) -> Self {
        Self {
            path,
            size_bytes,
            content_hash,
            perceptual_hash: None,
            mtime_ns: 0,
            score: 0.0,
            label: None,
        }
    }
}

/// A set of at least two files believed to be duplicates: a group of
/// fewer than two items is a contradiction in terms.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup {
    pub group_id: String,
    pub items: Vec<DuplicateItem>,
}

impl DuplicateGroup {
    /// Build a group, enforcing the "at least two items" invariant. A
    /// single-item or empty candidate is not a duplicate group at all,
    /// so this returns `None` rather than panicking — callers treat it
    /// the same way the source treats singleton buckets: drop it.
    pub fn new(group_id: impl Into<String>, items: Vec<DuplicateItem>) -> Option<Self> {
        if items.len() < 2 {
            return None;
        }
        Some(Self {
            group_id: group_id.into(),
            items,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One line of an authorized [`DeletePlan`]: either the kept survivor or
/// a delete candidate, with an explainable reason.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DeletePlanItem {
    pub path: PathBuf,
    pub group_id: String,
    pub reason: String,
    pub survivor: bool,
    pub size_bytes: u64,
}

/// An auditable, token-gated deletion plan. Exactly one survivor per
/// represented `group_id`.
#[derive(Debug, Clone)]
pub struct DeletePlan {
    pub token: String,
    pub deletion_policy: DeletionPolicy,
    pub items: Vec<DeletePlanItem>,
}

impl DeletePlan {
    /// Delete candidates only (survivors excluded).
    pub fn delete_candidates(&self) -> impl Iterator<Item = &DeletePlanItem> {
        self.items.iter().filter(|item| !item.survivor)
    }
}

/// Identity used to detect hardlinked files: `(device_id, inode,
/// link_count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    pub device_id: u64,
    pub inode: u64,
    pub link_count: u64,
}

impl FileIdentity {
    pub fn is_hardlinked(&self) -> bool {
        self.link_count > 1
    }

    /// Read a path's identity from the filesystem. Follows symlinks
    /// only when `follow_symlinks` is set, matching the discovery
    /// stage's own symlink policy.
    pub fn from_path(path: &Path, follow_symlinks: bool) -> std::io::Result<Self> {
        let meta = if follow_symlinks {
            std::fs::metadata(path)?
        } else {
            std::fs::symlink_metadata(path)?
        };
        Ok(Self::from_metadata(&meta))
    }

    #[cfg(unix)]
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            device_id: meta.dev(),
            inode: meta.ino(),
            link_count: meta.nlink(),
        }
    }

    #[cfg(windows)]
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        use std::os::windows::fs::MetadataExt;
        Self {
            device_id: meta.volume_serial_number().unwrap_or(0) as u64,
            inode: meta.file_index().unwrap_or(0),
            link_count: meta.number_of_links().unwrap_or(1) as u64,
        }
    }

    #[cfg(not(any(unix, windows)))]
    pub fn from_metadata(_meta: &std::fs::Metadata) -> Self {
        Self {
            device_id: 0,
            inode: 0,
            link_count: 1,
        }
    }
}
