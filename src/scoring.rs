//! Scoring stage: assigns an explainable `score` to every item in a
//! group so decision can pick a survivor without guessing. Never fails
//! — missing attributes simply contribute zero.

use crate::model::DuplicateGroup;

const KEEP_TOKENS: [&str; 6] = ["final", "master", "approved", "best", "keep", "original"];
const GHOST_TOKENS: [&str; 8] = [
    "copy",
    "duplicate",
    "backup",
    "temp",
    "export",
    "edited",
    "edit",
    "tmp",
];

/// Filename stem, lowercased, used for token matching.
fn normalized_stem(path: &std::path::Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Does the stem end with a copy-suggesting pattern: "(1)", " - copy",
/// " copy"?
fn has_copy_pattern(stem: &str) -> bool {
    if stem.ends_with(')') {
        if let Some(open) = stem.rfind('(') {
            let inner = &stem[open + 1..stem.len() - 1];
            if !inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit()) {
                return true;
            }
        }
    }
    stem.ends_with(" - copy") || stem.ends_with(" copy")
}

/// Additive token score from filename semantics: keep-tokens,
/// ghost-tokens, and copy-suggesting patterns.
fn token_score(stem: &str) -> f64 {
    let mut score = 0.0;
    for token in KEEP_TOKENS {
        if stem.contains(token) {
            score += 2.0;
        }
    }
    for token in GHOST_TOKENS {
        if stem.contains(token) {
            score -= 2.0;
        }
    }
    if has_copy_pattern(stem) {
        score -= 1.5;
    }
    score
}

/// Rank values 0.0 (worst) .. 1.0 (best). `higher_is_better` controls
/// which direction of the sort maps to 1.0.
fn rank(values: &[f64], higher_is_better: bool) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        let ordering = values[a].partial_cmp(&values[b]).unwrap_or(std::cmp::Ordering::Equal);
        if higher_is_better {
            ordering.reverse()
        } else {
            ordering
        }
    });

    let denom = (values.len() - 1).max(1) as f64;
    let mut ranks = vec![0.0; values.len()];
    for (pos, &idx) in order.iter().enumerate() {
        ranks[idx] = 1.0 - (pos as f64 / denom);
    }
    ranks
}

/// Optional per-item enrichment signals scoring can take into account
/// when known (EXIF/GPS presence). Absent when not computed upstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemEnrichment {
    pub exif_intact: Option<bool>,
    pub has_gps: Option<bool>,
}

/// Score every item in every group in place. `scan_intent` drives the
/// `nostalgic`/evidentiary behavior; `enrichment` is looked up by item
/// index within each group (same length as `group.items`, or empty to
/// skip enrichment entirely).
pub fn score_groups(groups: &mut [DuplicateGroup], scan_intent: &str, enrichment: &[Vec<ItemEnrichment>]) {
    let intent = scan_intent.to_lowercase();
    let nostalgic = intent.contains("nostalgic");
    let evidentiary = ["precious", "meticulous", "forensic"]
        .iter()
        .any(|k| intent.contains(k));

    for (gi, group) in groups.iter_mut().enumerate() {
        if group.items.len() < 2 {
            continue;
        }

        let sizes: Vec<f64> = group.items.iter().map(|it| it.size_bytes as f64).collect();
        let mtimes: Vec<f64> = group.items.iter().map(|it| it.mtime_ns as f64).collect();

        let size_rank = rank(&sizes, true);
        // nostalgic intent prefers older files, so mtime ranking flips.
        let time_rank = rank(&mtimes, !nostalgic);

        let empty_enrichment = Vec::new();
        let group_enrichment = enrichment.get(gi).unwrap_or(&empty_enrichment);

        for (idx, item) in group.items.iter_mut().enumerate() {
            let stem = normalized_stem(&item.path);
            let mut s = 0.0;

            s += 3.0 * size_rank[idx];
            s += 1.0 * time_rank[idx];

            let semantic = token_score(&stem);
            s += semantic;

            if let Some(e) = group_enrichment.get(idx) {
                match e.exif_intact {
                    Some(true) => s += 1.0,
                    Some(false) if evidentiary => s -= 0.5,
                    _ => {}
                }
                if e.has_gps == Some(true) {
                    s += 0.3;
                }
            }

            if evidentiary && semantic < 0.0 {
                s -= 0.5;
            }

            item.score = s;
            item.label = if semantic >= 2.0 {
                Some("keeper:semantic".to_string())
            } else if semantic <= -2.0 {
                Some("ghost:semantic".to_string())
            } else {
                None
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DuplicateItem;
    use std::path::PathBuf;

    fn item(name: &str, size: u64, mtime_ns: i64) -> DuplicateItem {
        let mut it = DuplicateItem::new(PathBuf::from(name), size, "hash".into());
        it.mtime_ns = mtime_ns;
        it
    }

    #[test]
    fn larger_file_scores_higher_all_else_equal() {
        let mut groups = vec![
            DuplicateGroup::new("g1", vec![item("a.txt", 100, 0), item("b.txt", 200, 0)]).unwrap(),
        ];
        score_groups(&mut groups, "", &[]);
        assert!(groups[0].items[1].score > groups[0].items[0].score);
    }

    #[test]
    fn keep_token_boosts_score() {
        let mut groups = vec![
            DuplicateGroup::new("g1", vec![item("photo.txt", 100, 0), item("photo_final.txt", 100, 0)]).unwrap(),
        ];
        score_groups(&mut groups, "", &[]);
        assert!(groups[0].items[1].score > groups[0].items[0].score);
        assert_eq!(groups[0].items[1].label.as_deref(), Some("keeper:semantic"));
    }

    #[test]
    fn ghost_token_and_copy_pattern_penalize() {
        let mut groups = vec![
            DuplicateGroup::new(
                "g1",
                vec![item("photo.txt", 100, 0), item("photo (1).txt", 100, 0)],
            )
            .unwrap(),
        ];
        score_groups(&mut groups, "", &[]);
        assert!(groups[0].items[0].score > groups[0].items[1].score);
    }

    #[test]
    fn nostalgic_intent_flips_mtime_preference() {
        let older = item("a.txt", 100, 1_000);
        let newer = item("b.txt", 100, 2_000);

        let mut normal = vec![DuplicateGroup::new("g1", vec![older.clone(), newer.clone()]).unwrap()];
        score_groups(&mut normal, "", &[]);
        assert!(normal[0].items[1].score > normal[0].items[0].score, "normally newer wins");

        let mut nostalgic = vec![DuplicateGroup::new("g1", vec![older, newer]).unwrap()];
        score_groups(&mut nostalgic, "nostalgic archive", &[]);
        assert!(nostalgic[0].items[0].score > nostalgic[0].items[1].score, "nostalgic: older wins");
    }

    #[test]
    fn evidentiary_intent_adds_extra_ghost_penalty() {
        let plain = item("vacation_copy.txt", 100, 0);
        let mut normal = vec![DuplicateGroup::new("g1", vec![item("vacation.txt", 100, 0), plain.clone()]).unwrap()];
        score_groups(&mut normal, "", &[]);
        let normal_gap = normal[0].items[0].score - normal[0].items[1].score;

        let mut forensic = vec![DuplicateGroup::new("g1", vec![item("vacation.txt", 100, 0), plain]).unwrap()];
        score_groups(&mut forensic, "forensic case", &[]);
        let forensic_gap = forensic[0].items[0].score - forensic[0].items[1].score;

        assert!(forensic_gap > normal_gap);
    }

    #[test]
    fn missing_attributes_never_panic() {
        let mut groups = vec![DuplicateGroup::new("g1", vec![item("a", 0, 0), item("b", 0, 0)]).unwrap()];
        score_groups(&mut groups, "", &[]);
        assert_eq!(groups[0].items[0].score, groups[0].items[1].score);
    }
}
