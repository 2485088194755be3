//! Decision stage: picks exactly one survivor per group from the
//! scores assigned upstream, and assembles an auditable, token-gated
//! [`DeletePlan`]. Never deletes anything — planning only.

use crate::cancel::CancellationToken;
use crate::model::{DeletePlan, DeletePlanItem, DeletionPolicy, DuplicateGroup, PipelineRequest};

const REASON_SURVIVOR: &str = "survivor:selected_by_score";
const REASON_DUPLICATE: &str = "duplicate:lower_score";

/// Rank a group's items by score, highest first; in validation mode,
/// ties break on path for determinism.
fn ranked_indices(group: &DuplicateGroup, validation_mode: bool) -> Vec<usize> {
    let mut order: Vec<usize> = (0..group.items.len()).collect();
    order.sort_by(|&a, &b| {
        let by_score = group.items[b]
            .score
            .partial_cmp(&group.items[a].score)
            .unwrap_or(std::cmp::Ordering::Equal);
        if validation_mode && by_score == std::cmp::Ordering::Equal {
            group.items[a].path.cmp(&group.items[b].path)
        } else {
            by_score
        }
    });
    order
}

/// Build the delete plan for a full set of scored groups. Skips groups
/// with fewer than two items (nothing to decide) and stops early if
/// cancelled, returning whatever was already decided.
pub fn decide(
    groups: &[DuplicateGroup],
    request: &PipelineRequest,
    cancel: &CancellationToken,
) -> DeletePlan {
    let token = uuid::Uuid::new_v4().simple().to_string();
    let mut items = Vec::new();

    for group in groups {
        if cancel.is_cancelled() {
            break;
        }
        if group.items.len() < 2 {
            continue;
        }

        let order = ranked_indices(group, request.validation_mode);
        for (rank, &idx) in order.iter().enumerate() {
            let is_survivor = rank == 0;
            let dup_item = &group.items[idx];
            items.push(DeletePlanItem {
                path: dup_item.path.clone(),
                group_id: group.group_id.clone(),
                reason: if is_survivor { REASON_SURVIVOR } else { REASON_DUPLICATE }.to_string(),
                survivor: is_survivor,
                size_bytes: dup_item.size_bytes,
            });
        }
    }

    DeletePlan {
        token,
        deletion_policy: DeletionPolicy::DryRun,
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DuplicateItem;
    use std::path::PathBuf;

    fn item(name: &str, score: f64) -> DuplicateItem {
        let mut it = DuplicateItem::new(PathBuf::from(name), 100, "hash".into());
        it.score = score;
        it
    }

    #[test]
    fn highest_score_survives() {
        let groups = vec![DuplicateGroup::new("g1", vec![item("a", 1.0), item("b", 5.0)]).unwrap()];
        let req = PipelineRequest::builder(vec![PathBuf::from("/tmp")]).build();
        let plan = decide(&groups, &req, &CancellationToken::new());

        let survivor = plan.items.iter().find(|i| i.survivor).unwrap();
        assert_eq!(survivor.path, PathBuf::from("b"));
        assert_eq!(survivor.reason, "survivor:selected_by_score");

        let dup = plan.items.iter().find(|i| !i.survivor).unwrap();
        assert_eq!(dup.reason, "duplicate:lower_score");
    }

    #[test]
    fn exactly_one_survivor_per_group() {
        let groups = vec![
            DuplicateGroup::new("g1", vec![item("a", 1.0), item("b", 1.0), item("c", 1.0)]).unwrap(),
        ];
        let req = PipelineRequest::builder(vec![PathBuf::from("/tmp")]).build();
        let plan = decide(&groups, &req, &CancellationToken::new());
        assert_eq!(plan.items.iter().filter(|i| i.survivor).count(), 1);
    }

    #[test]
    fn validation_mode_ties_break_on_path() {
        let groups = vec![DuplicateGroup::new("g1", vec![item("z", 1.0), item("a", 1.0)]).unwrap()];
        let req = PipelineRequest::builder(vec![PathBuf::from("/tmp")])
            .validation_mode(true)
            .build();
        let plan = decide(&groups, &req, &CancellationToken::new());
        let survivor = plan.items.iter().find(|i| i.survivor).unwrap();
        assert_eq!(survivor.path, PathBuf::from("a"));
    }

    #[test]
    fn token_is_32_char_hex() {
        let req = PipelineRequest::builder(vec![PathBuf::from("/tmp")]).build();
        let plan = decide(&[], &req, &CancellationToken::new());
        assert_eq!(plan.token.len(), 32);
        assert!(plan.token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn cancellation_stops_early_without_panicking() {
        let groups = vec![DuplicateGroup::new("g1", vec![item("a", 1.0), item("b", 2.0)]).unwrap()];
        let req = PipelineRequest::builder(vec![PathBuf::from("/tmp")]).build();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let plan = decide(&groups, &req, &cancel);
        assert!(plan.items.is_empty());
    }
}
