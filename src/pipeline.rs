//! Pipeline orchestrator: composes the stages, owns the cancellation
//! handle and progress stream, and maps phase transitions onto the
//! 0-100% progress scale consumers expect.

use crate::cancel::CancellationToken;
use crate::model::{DeletePlan, DuplicateGroup, Mode, PipelineRequest};
use crate::progress::{Phase, ProgressSink};
use crate::{clustering, decision, discovery, grouping, hashing, scoring, visual_similarity};
use serde_json::json;

#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub groups: Vec<DuplicateGroup>,
    pub delete_plan: Option<DeletePlan>,
    pub stats: serde_json::Value,
    pub cancelled: bool,
}

/// Run discovery through decision for `Mode::Scan` (content-hash
/// duplicates) or `Mode::Similar` (perceptual-hash near-duplicates).
/// `Mode::Delete` is not handled here — see [`crate::executor::execute`],
/// which consumes the plan this stage produces.
pub fn run(request: &PipelineRequest, cancel: &CancellationToken, progress: &ProgressSink) -> PipelineResult {
    progress.emit(Phase::Discover, "discovering files", 0);
    let files = discovery::discover(request, cancel);
    if cancel.is_cancelled() {
        progress.emit(Phase::Cancelled, "cancelled during discovery", 0);
        return cancelled_result();
    }
    progress.emit(Phase::Discover, format!("found {} files", files.len()), 20);

    let groups = match request.mode {
        Mode::Similar => run_similar_branch(request, &files, cancel, progress),
        _ => run_content_hash_branch(request, &files, cancel, progress),
    };

    if cancel.is_cancelled() {
        progress.emit(Phase::Cancelled, "cancelled before decision", 85);
        return cancelled_result();
    }

    let mut groups = groups;
    progress.emit(Phase::Score, "scoring group members", 85);
    scoring::score_groups(&mut groups, &request.scan_intent, &[]);

    progress.emit(Phase::Decide, "selecting survivors", 90);
    let plan = decision::decide(&groups, request, cancel);

    progress.emit(Phase::Complete, "pipeline complete", 100);

    PipelineResult {
        stats: json!({
            "files_discovered": files.len(),
            "groups_found": groups.len(),
        }),
        groups,
        delete_plan: Some(plan),
        cancelled: false,
    }
}

fn run_content_hash_branch(
    request: &PipelineRequest,
    files: &[crate::model::DiscoveredFile],
    cancel: &CancellationToken,
    progress: &ProgressSink,
) -> Vec<DuplicateGroup> {
    let size_groups = grouping::group_by_size(files, request, cancel);
    if cancel.is_cancelled() {
        return Vec::new();
    }
    progress.emit(Phase::SizeGroup, format!("{} size buckets", size_groups.len()), 25);

    let partial_groups = hashing::partial_hash(&size_groups, request, cancel);
    if cancel.is_cancelled() {
        return Vec::new();
    }
    progress.emit(Phase::PartialHash, format!("{} partial-hash buckets", partial_groups.len()), 60);

    let hash_groups = if request.use_full_hash {
        let full = hashing::full_hash(&partial_groups, request, cancel);
        progress.emit(Phase::FullHash, format!("{} full-hash buckets", full.len()), 85);
        full
    } else {
        partial_groups
    };
    if cancel.is_cancelled() {
        return Vec::new();
    }

    let groups = clustering::to_groups(&hash_groups, request, cancel);
    progress.emit(Phase::Cluster, format!("{} duplicate groups", groups.len()), 85);
    groups
}

fn run_similar_branch(
    request: &PipelineRequest,
    files: &[crate::model::DiscoveredFile],
    cancel: &CancellationToken,
    progress: &ProgressSink,
) -> Vec<DuplicateGroup> {
    let paths: Vec<_> = files.iter().map(|f| f.path.clone()).collect();
    let groups = visual_similarity::cluster_similar(&paths, request, cancel);
    progress.emit(Phase::Cluster, format!("{} visual-similarity groups", groups.len()), 85);
    groups
}

fn cancelled_result() -> PipelineResult {
    PipelineResult {
        groups: Vec::new(),
        delete_plan: None,
        stats: json!({}),
        cancelled: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Mode;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn scan_mode_finds_exact_duplicates() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), b"same content").unwrap();
        fs::write(dir.path().join("b.txt"), b"same content").unwrap();
        fs::write(dir.path().join("c.txt"), b"different").unwrap();

        let request = PipelineRequest::builder(vec![dir.path().to_path_buf()])
            .mode(Mode::Scan)
            .build();
        let result = run(&request, &CancellationToken::new(), &ProgressSink::null());

        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].len(), 2);
        assert!(result.delete_plan.is_some());
        assert!(!result.cancelled);
    }

    #[test]
    fn cancellation_before_discovery_returns_cancelled_result() {
        let dir = TempDir::new().unwrap();
        let request = PipelineRequest::builder(vec![dir.path().to_path_buf()]).build();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = run(&request, &cancel, &ProgressSink::null());
        assert!(result.cancelled);
        assert!(result.groups.is_empty());
    }

    #[test]
    fn no_duplicates_yields_empty_groups_and_empty_plan_items() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), b"unique-a").unwrap();
        fs::write(dir.path().join("b.txt"), b"unique-b").unwrap();

        let request = PipelineRequest::builder(vec![dir.path().to_path_buf()]).build();
        let result = run(&request, &CancellationToken::new(), &ProgressSink::null());

        assert!(result.groups.is_empty());
        assert!(result.delete_plan.unwrap().items.is_empty());
    }

    #[test]
    fn validation_mode_is_deterministic_across_runs() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("z.txt"), b"dup").unwrap();
        fs::write(dir.path().join("a.txt"), b"dup").unwrap();

        let request = PipelineRequest::builder(vec![dir.path().to_path_buf()])
            .validation_mode(true)
            .build();

        let r1 = run(&request, &CancellationToken::new(), &ProgressSink::null());
        let r2 = run(&request, &CancellationToken::new(), &ProgressSink::null());

        let paths1: Vec<PathBuf> = r1.groups[0].items.iter().map(|i| i.path.clone()).collect();
        let paths2: Vec<PathBuf> = r2.groups[0].items.iter().map(|i| i.path.clone()).collect();
        assert_eq!(paths1, paths2);
    }
}
