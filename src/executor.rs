//! Execution stage: consumes an authorized [`DeletePlan`] and actually
//! touches the filesystem. Everything upstream only plans; this is the
//! single place that deletes.

use crate::cancel::CancellationToken;
use crate::fs_policy::should_block_delete;
use crate::model::{DeletePlan, DeletionPolicy, PipelineRequest};
use crate::progress::{Phase, ProgressSink};
use crate::trash::{self, TrashAction};

#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    pub deleted_count: usize,
    pub failed_count: usize,
    pub failures: Vec<(std::path::PathBuf, String)>,
    pub trash_action: Option<TrashAction>,
}

/// Apply `plan`'s delete candidates according to `request.deletion_policy`.
/// `scan_root` anchors the trash mirror when the policy is
/// `MoveToTrash`; it is ignored otherwise.
pub fn execute(
    plan: &DeletePlan,
    request: &PipelineRequest,
    scan_root: &std::path::Path,
    cancel: &CancellationToken,
    progress: &ProgressSink,
) -> ExecutionOutcome {
    let mut outcome = ExecutionOutcome::default();

    match request.deletion_policy {
        DeletionPolicy::DryRun => {
            for item in plan.delete_candidates() {
                progress.emit(Phase::Delete, format!("[DRY] would remove {}", item.path.display()), 90);
                outcome.deleted_count += 1;
            }
        }
        DeletionPolicy::MoveToTrash => match trash::move_duplicates(plan, scan_root) {
            Ok(action) => {
                outcome.deleted_count = action.moved.len();
                outcome.failed_count = action.failures.len();
                outcome.failures.extend(action.failures.iter().cloned());
                for (path, reason) in &action.failures {
                    progress.emit(Phase::Delete, format!("failed {}: {reason}", path.display()), 90);
                }
                outcome.trash_action = Some(action);
            }
            Err(e) => {
                // Whole-operation failure (e.g. trash root itself could not
                // be created) before any per-item work started.
                outcome.failed_count = plan.delete_candidates().count();
                outcome.failures.push((scan_root.to_path_buf(), e.to_string()));
            }
        },
        DeletionPolicy::DeletePermanently => {
            for item in plan.delete_candidates() {
                if cancel.is_cancelled() {
                    break;
                }

                if !item.path.exists() {
                    outcome.deleted_count += 1;
                    progress.emit(Phase::Delete, format!("already gone: {}", item.path.display()), 90);
                    continue;
                }

                if let Some(reason) = should_block_delete(&item.path, request.allow_hardlink_deletes, request.follow_symlinks) {
                    outcome.failed_count += 1;
                    outcome.failures.push((item.path.clone(), reason.clone()));
                    progress.emit(Phase::Delete, format!("blocked {}: {reason}", item.path.display()), 90);
                    continue;
                }

                match std::fs::remove_file(&item.path) {
                    Ok(()) => {
                        outcome.deleted_count += 1;
                        progress.emit(Phase::Delete, format!("removed {}", item.path.display()), 90);
                    }
                    Err(e) => {
                        outcome.failed_count += 1;
                        outcome.failures.push((item.path.clone(), e.to_string()));
                        progress.emit(Phase::Delete, format!("failed {}: {e}", item.path.display()), 90);
                    }
                }
            }
        }
    }

    progress.emit(
        Phase::Record,
        format!("deleted={} failed={}", outcome.deleted_count, outcome.failed_count),
        95,
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeletePlanItem;
    use std::fs;
    use tempfile::TempDir;

    fn req(policy: DeletionPolicy) -> PipelineRequest {
        PipelineRequest::builder(vec![std::path::PathBuf::from("/tmp")])
            .deletion_policy(policy)
            .build()
    }

    fn plan_with_one_candidate(path: std::path::PathBuf) -> DeletePlan {
        plan_with_candidates(vec![path])
    }

    fn plan_with_candidates(paths: Vec<std::path::PathBuf>) -> DeletePlan {
        DeletePlan {
            token: "tok".into(),
            deletion_policy: DeletionPolicy::DryRun,
            items: paths
                .into_iter()
                .enumerate()
                .map(|(i, path)| DeletePlanItem {
                    path,
                    group_id: format!("g{i}"),
                    reason: "duplicate:lower_score".into(),
                    survivor: false,
                    size_bytes: 1,
                })
                .collect(),
        }
    }

    #[test]
    fn dry_run_never_touches_filesystem() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"x").unwrap();

        let plan = plan_with_one_candidate(path.clone());
        let outcome = execute(&plan, &req(DeletionPolicy::DryRun), dir.path(), &CancellationToken::new(), &ProgressSink::null());

        assert_eq!(outcome.deleted_count, 1);
        assert!(path.exists());
    }

    #[test]
    fn move_to_trash_relocates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"x").unwrap();

        let plan = plan_with_one_candidate(path.clone());
        let outcome = execute(&plan, &req(DeletionPolicy::MoveToTrash), dir.path(), &CancellationToken::new(), &ProgressSink::null());

        assert_eq!(outcome.deleted_count, 1);
        assert!(!path.exists());
        assert!(outcome.trash_action.is_some());
    }

    #[test]
    fn permanent_delete_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"x").unwrap();

        let plan = plan_with_one_candidate(path.clone());
        let outcome = execute(&plan, &req(DeletionPolicy::DeletePermanently), dir.path(), &CancellationToken::new(), &ProgressSink::null());

        assert_eq!(outcome.deleted_count, 1);
        assert_eq!(outcome.failed_count, 0);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn move_to_trash_one_failure_does_not_mark_the_whole_batch_failed() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let ok_dir = dir.path().join("ok");
        let bad_dir = dir.path().join("bad");
        fs::create_dir_all(&ok_dir).unwrap();
        fs::create_dir_all(&bad_dir).unwrap();

        let good = ok_dir.join("a.txt");
        let bad = bad_dir.join("b.txt");
        fs::write(&good, b"x").unwrap();
        fs::write(&bad, b"x").unwrap();

        fs::set_permissions(&bad_dir, fs::Permissions::from_mode(0o555)).unwrap();

        let plan = plan_with_candidates(vec![good.clone(), bad.clone()]);
        let outcome = execute(&plan, &req(DeletionPolicy::MoveToTrash), dir.path(), &CancellationToken::new(), &ProgressSink::null());

        fs::set_permissions(&bad_dir, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(outcome.deleted_count, 1, "the file that could be moved must still count as deleted");
        assert_eq!(outcome.failed_count, 1, "only the one failing item should count as failed");
        assert!(!good.exists());
        assert!(bad.exists());
        assert!(outcome.trash_action.is_some(), "successful moves must still be recorded for undo");
    }

    #[cfg(unix)]
    #[test]
    fn permanent_delete_blocks_hardlinked_file() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, b"x").unwrap();
        fs::hard_link(&a, &b).unwrap();

        let plan = plan_with_one_candidate(a.clone());
        let outcome = execute(&plan, &req(DeletionPolicy::DeletePermanently), dir.path(), &CancellationToken::new(), &ProgressSink::null());

        assert_eq!(outcome.failed_count, 1);
        assert!(a.exists());
    }

    #[test]
    fn permanent_delete_of_missing_file_is_not_a_failure() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone.txt");

        let plan = plan_with_one_candidate(missing);
        let outcome = execute(&plan, &req(DeletionPolicy::DeletePermanently), dir.path(), &CancellationToken::new(), &ProgressSink::null());

        assert_eq!(outcome.deleted_count, 1);
        assert_eq!(outcome.failed_count, 0);
    }
}
