//! Progress events and sinks.
//!
//! The pipeline reports through an [`EventSink`] passed into the run,
//! never by printing from orchestration code. Lifecycle events
//! (StepStart/StepEnd) carry a [`ProgressInfo`] snapshot; raw channel
//! output passes through as Stdout/Stderr/Done/Error events.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::{Step, StepStatus};
use crate::log_status;

const STAGE: &str = "deploying";

/// Point-in-time completion snapshot emitted at step boundaries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressInfo {
    pub stage: String,
    /// `completed steps / total steps * 100`, in [0, 100].
    pub percentage: f64,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// 1-based index of the step this event concerns.
    pub step_number: usize,
    pub total_steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<Step>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub completed_steps: Vec<Step>,
}

impl ProgressInfo {
    pub(crate) fn step_start(
        step: &Step,
        step_number: usize,
        total_steps: usize,
        completed_before: usize,
    ) -> Self {
        Self {
            stage: STAGE.to_string(),
            percentage: percentage(completed_before, total_steps),
            message: format!("Starting step {}/{}: {}", step_number, total_steps, step.name),
            timestamp: Utc::now(),
            step_number,
            total_steps,
            current_step: Some(step.clone()),
            completed_steps: Vec::new(),
        }
    }

    pub(crate) fn step_end(
        step: &Step,
        step_number: usize,
        total_steps: usize,
        completed: &[Step],
    ) -> Self {
        let verdict = match step.status {
            StepStatus::Completed => "completed",
            StepStatus::Skipped => "skipped",
            StepStatus::Failed => "failed",
            StepStatus::Pending | StepStatus::Running => "running",
        };
        Self {
            stage: STAGE.to_string(),
            percentage: percentage(completed.len(), total_steps),
            message: format!(
                "Step {}/{} {}: {}",
                step_number, total_steps, verdict, step.name
            ),
            timestamp: Utc::now(),
            step_number,
            total_steps,
            current_step: None,
            completed_steps: completed.to_vec(),
        }
    }
}

fn percentage(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    completed as f64 / total as f64 * 100.0
}

/// Envelope for everything observable during a run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: StreamEventKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEventKind {
    StepStart { progress: ProgressInfo },
    StepEnd { progress: ProgressInfo },
    Stdout { line: String },
    Stderr { line: String },
    Done { success: bool, exit_code: i32 },
    Error { message: String },
}

impl StreamEvent {
    pub fn now(kind: StreamEventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
        }
    }
}

/// Observer for run events. Advisory only: sinks never influence
/// control flow.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &StreamEvent);
}

/// Sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &StreamEvent) {}
}

/// Sink that writes human-readable status lines to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &StreamEvent) {
        match &event.kind {
            StreamEventKind::StepStart { progress } => {
                log_status!("deploy", "{}", progress.message);
            }
            StreamEventKind::StepEnd { progress } => {
                log_status!("deploy", "{} ({:.0}%)", progress.message, progress.percentage);
            }
            StreamEventKind::Stderr { line } => {
                log_status!("deploy", "  {}", line);
            }
            StreamEventKind::Error { message } => {
                log_status!("deploy", "Error: {}", message);
            }
            StreamEventKind::Stdout { .. } | StreamEventKind::Done { .. } => {}
        }
    }
}

/// Sink that records every event, for callers that render their own
/// progress and for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<StreamEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StreamEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &StreamEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{build_catalog, DeployParams};

    #[test]
    fn start_percentage_excludes_current_step() {
        let steps = build_catalog(&DeployParams::new("webapp"));
        let info = ProgressInfo::step_start(&steps[2], 3, 8, 2);
        assert_eq!(info.percentage, 25.0);
        assert!(info.current_step.is_some());
        assert!(info.completed_steps.is_empty());
    }

    #[test]
    fn end_percentage_includes_finished_steps() {
        let mut steps = build_catalog(&DeployParams::new("webapp"));
        let now = Utc::now();
        for step in steps.iter_mut().take(4) {
            step.mark_running(now);
            step.finish(StepStatus::Completed, now);
        }
        let completed: Vec<Step> = steps[..4].to_vec();
        let info = ProgressInfo::step_end(&steps[3], 4, 8, &completed);
        assert_eq!(info.percentage, 50.0);
        assert!(info.current_step.is_none());
        assert_eq!(info.completed_steps.len(), 4);
    }

    #[test]
    fn memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.emit(&StreamEvent::now(StreamEventKind::Stdout {
            line: "one".to_string(),
        }));
        sink.emit(&StreamEvent::now(StreamEventKind::Stdout {
            line: "two".to_string(),
        }));
        let events = sink.events();
        assert_eq!(events.len(), 2);
    }
}
