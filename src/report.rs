//! JSON audit report: a single `cerebro.report.v1`-schema file
//! capturing the request, duplicate groups, and delete plan for a run.

use crate::error::{CerebroError, Result};
use crate::model::{DeletePlan, DuplicateGroup, Mode, PipelineRequest};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
pub struct RequestSummary {
    pub roots: Vec<String>,
    pub mode: Mode,
    pub use_full_hash: bool,
    pub validation_mode: bool,
    /// Reserved for free-form request options; `PipelineRequest` exposes
    /// its settings as explicit typed fields rather than an options bag,
    /// so this is always an empty object. Kept so the report matches the
    /// documented `cerebro.report.v1` schema.
    pub options: serde_json::Value,
}

impl From<&PipelineRequest> for RequestSummary {
    fn from(request: &PipelineRequest) -> Self {
        Self {
            roots: request.roots.iter().map(|p| p.display().to_string()).collect(),
            mode: request.mode,
            use_full_hash: request.use_full_hash,
            validation_mode: request.validation_mode,
            options: serde_json::json!({}),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GroupSummary {
    pub key: String,
    pub size: u64,
    pub count: usize,
    pub paths: Vec<String>,
}

impl From<&DuplicateGroup> for GroupSummary {
    fn from(group: &DuplicateGroup) -> Self {
        Self {
            key: group.group_id.clone(),
            size: group.items.first().map(|i| i.size_bytes).unwrap_or(0),
            count: group.items.len(),
            paths: group.items.iter().map(|i| i.path.display().to_string()).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeletePlanItemSummary {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct DeletePlanSummary {
    pub policy: Option<String>,
    pub dry_run: bool,
    pub token_present: bool,
    pub items: Vec<DeletePlanItemSummary>,
}

impl From<&DeletePlan> for DeletePlanSummary {
    fn from(plan: &DeletePlan) -> Self {
        Self {
            policy: Some(format!("{:?}", plan.deletion_policy)),
            dry_run: matches!(plan.deletion_policy, crate::model::DeletionPolicy::DryRun),
            token_present: !plan.token.is_empty(),
            items: plan
                .items
                .iter()
                .map(|i| DeletePlanItemSummary {
                    path: i.path.display().to_string(),
                    reason: i.reason.clone(),
                })
                .collect(),
        }
    }
}

fn empty_delete_plan_summary() -> DeletePlanSummary {
    DeletePlanSummary {
        policy: None,
        dry_run: true,
        token_present: false,
        items: Vec::new(),
    }
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub schema: &'static str,
    pub generated_ts: f64,
    pub scan_id: String,
    pub request: RequestSummary,
    pub stats: serde_json::Value,
    pub groups: Vec<GroupSummary>,
    pub delete_plan: DeletePlanSummary,
}

pub const REPORT_SCHEMA: &str = "cerebro.report.v1";

/// Build the in-memory report payload; `generated_ts` is supplied by
/// the caller (floating Unix seconds) so this stays a pure function.
pub fn build_report(
    scan_id: &str,
    request: &PipelineRequest,
    stats: serde_json::Value,
    groups: &[DuplicateGroup],
    delete_plan: Option<&DeletePlan>,
    generated_ts: f64,
) -> Report {
    Report {
        schema: REPORT_SCHEMA,
        generated_ts,
        scan_id: scan_id.to_string(),
        request: RequestSummary::from(request),
        stats,
        groups: groups.iter().map(GroupSummary::from).collect(),
        delete_plan: delete_plan.map(DeletePlanSummary::from).unwrap_or_else(empty_delete_plan_summary),
    }
}

/// Write the report as pretty-printed JSON to `out_path`, creating
/// parent directories as needed.
pub fn write_json_report(out_path: &Path, report: &Report) -> Result<PathBuf> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| CerebroError::ReportWrite {
            path: out_path.to_path_buf(),
            source,
        })?;
    }

    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(out_path, json).map_err(|source| CerebroError::ReportWrite {
        path: out_path.to_path_buf(),
        source,
    })?;
    Ok(out_path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeletePlanItem, DeletionPolicy};
    use tempfile::TempDir;

    fn req() -> PipelineRequest {
        PipelineRequest::builder(vec![PathBuf::from("/tmp")]).build()
    }

    #[test]
    fn schema_field_is_exact() {
        let report = build_report("scan1", &req(), serde_json::json!({}), &[], None, 0.0);
        assert_eq!(report.schema, "cerebro.report.v1");
    }

    #[test]
    fn empty_delete_plan_defaults_dry_run_true() {
        let report = build_report("scan1", &req(), serde_json::json!({}), &[], None, 0.0);
        assert!(report.delete_plan.dry_run);
        assert!(!report.delete_plan.token_present);
    }

    #[test]
    fn plan_with_token_reports_token_present() {
        let plan = DeletePlan {
            token: "abc123".into(),
            deletion_policy: DeletionPolicy::MoveToTrash,
            items: vec![DeletePlanItem {
                path: PathBuf::from("a"),
                group_id: "g1".into(),
                reason: "duplicate:lower_score".into(),
                survivor: false,
                size_bytes: 1,
            }],
        };
        let report = build_report("scan1", &req(), serde_json::json!({}), &[], Some(&plan), 0.0);
        assert!(report.delete_plan.token_present);
        assert_eq!(report.delete_plan.items.len(), 1);
    }

    #[test]
    fn request_summary_includes_empty_options_object() {
        let report = build_report("scan1", &req(), serde_json::json!({}), &[], None, 0.0);
        let value = serde_json::to_value(&report.request).unwrap();
        assert_eq!(value["options"], serde_json::json!({}));
    }

    #[test]
    fn write_json_report_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let out_path = dir.path().join("nested/report.json");
        let report = build_report("scan1", &req(), serde_json::json!({}), &[], None, 0.0);
        let written = write_json_report(&out_path, &report).unwrap();
        assert!(written.exists());
        let content = std::fs::read_to_string(&written).unwrap();
        assert!(content.contains("cerebro.report.v1"));
    }
}
