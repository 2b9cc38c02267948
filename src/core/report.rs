//! Run result aggregation.
//!
//! A [`RunReport`] is produced exactly once, after the pipeline reaches
//! the end of the catalog (or after a standard-mode run). Aborted runs
//! return an error and no report.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::catalog::{Step, StepStatus};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    pub success: bool,
    pub changed: bool,
    /// Set when the run fell back to single-command standard mode
    /// because the channel had no streaming capability.
    #[serde(skip_serializing_if = "is_false")]
    pub degraded: bool,
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub data: RunData,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunData {
    pub total_steps: usize,
    pub completed_steps: usize,
    pub failed_steps: usize,
    pub steps: Vec<Step>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Reduce a finished run into its report.
///
/// Called only when the orchestrator reached the end of the catalog;
/// `failed_steps` counts Failed entries (Skipped steps are accepted
/// non-critical failures and are excluded).
pub fn aggregate(
    total_steps: usize,
    completed: Vec<Step>,
    started_at: Option<DateTime<Utc>>,
) -> RunReport {
    let finished_at = Utc::now();
    let started_at = started_at.unwrap_or(finished_at);
    let failed_steps = completed
        .iter()
        .filter(|s| s.status == StepStatus::Failed)
        .count();

    RunReport {
        run_id: Uuid::new_v4().to_string(),
        success: true,
        changed: !completed.is_empty(),
        degraded: false,
        message: format!(
            "Deployment completed: {}/{} steps finished",
            completed.len(),
            total_steps
        ),
        started_at,
        finished_at,
        duration_ms: (finished_at - started_at).num_milliseconds(),
        data: RunData {
            total_steps,
            completed_steps: completed.len(),
            failed_steps,
            steps: completed,
            metadata: HashMap::new(),
        },
    }
}
