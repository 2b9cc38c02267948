//! Step orchestrator.
//!
//! Executes a catalog strictly in order against a streaming channel:
//! later steps assume the filesystem/service state their predecessors
//! left behind, so step n+1 never starts before step n reaches a
//! terminal status. Critical failures abort the run (after the rollback
//! attempt); non-critical failures are absorbed as Skipped.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::catalog::{DeployParams, Step, StepStatus};
use crate::channel::{CancelToken, ExecOptions, ExecutionChannel, StreamingChannel, SubEvent};
use crate::error::{Error, Result};
use crate::log_status;
use crate::progress::{EventSink, ProgressInfo, StreamEvent, StreamEventKind};
use crate::report::{self, RunReport};
use crate::rollback::{self, RollbackOutcome};

/// Run the full catalog and aggregate the result.
///
/// `exec` and `stream` are the same channel seen through its two
/// capabilities; the caller dispatched on `streaming()` before handing
/// it in.
pub fn run_catalog(
    catalog: Vec<Step>,
    params: &DeployParams,
    exec: &dyn ExecutionChannel,
    stream: &dyn StreamingChannel,
    sink: &dyn EventSink,
    cancel: &CancelToken,
) -> Result<RunReport> {
    let total = catalog.len();
    let options = ExecOptions {
        timeout_secs: Some(crate::defaults::STEP_TIMEOUT_SECS),
    };

    let mut completed: Vec<Step> = Vec::with_capacity(total);
    let mut first_start: Option<DateTime<Utc>> = None;

    for (index, mut step) in catalog.into_iter().enumerate() {
        let step_number = index + 1;

        step.mark_running(Utc::now());
        if first_start.is_none() {
            first_start = step.started_at;
        }
        sink.emit(&StreamEvent::now(StreamEventKind::StepStart {
            progress: ProgressInfo::step_start(&step, step_number, total, completed.len()),
        }));

        let failure = run_step(&step, stream, &options, sink, cancel).err();

        let terminal = if failure.is_some() {
            StepStatus::Failed
        } else {
            StepStatus::Completed
        };
        step.finish(terminal, Utc::now());

        if let Some(cause) = failure {
            if step.critical {
                completed.push(step.clone());
                sink.emit(&StreamEvent::now(StreamEventKind::StepEnd {
                    progress: ProgressInfo::step_end(&step, step_number, total, &completed),
                }));

                let outcome = handle_critical_failure(params, exec, &completed);
                return Err(Error::critical_step_failed(
                    &step.id,
                    &step.name,
                    cause,
                    outcome.as_str(),
                    completed.len(),
                ));
            }

            // Non-critical failures are absorbed: record the step as
            // skipped and keep going.
            step.status = StepStatus::Skipped;
            log_status!(
                "deploy",
                "Non-critical step '{}' failed, continuing: {}",
                step.name,
                cause
            );
        }

        completed.push(step.clone());
        sink.emit(&StreamEvent::now(StreamEventKind::StepEnd {
            progress: ProgressInfo::step_end(&step, step_number, total, &completed),
        }));
    }

    Ok(report::aggregate(total, completed, first_start))
}

/// Execute one step's command and consume its sub-event stream until
/// Done or Error. Returns the failure cause on any non-success.
fn run_step(
    step: &Step,
    stream: &dyn StreamingChannel,
    options: &ExecOptions,
    sink: &dyn EventSink,
    cancel: &CancelToken,
) -> std::result::Result<(), String> {
    let rx = stream
        .execute_stream(&step.command, options, cancel)
        .map_err(|err| err.message)?;

    loop {
        match next_event(&rx, options)? {
            SubEvent::Stdout(line) => {
                sink.emit(&StreamEvent::now(StreamEventKind::Stdout { line }));
            }
            SubEvent::Stderr(line) => {
                sink.emit(&StreamEvent::now(StreamEventKind::Stderr { line }));
            }
            SubEvent::Done(output) => {
                sink.emit(&StreamEvent::now(StreamEventKind::Done {
                    success: output.success,
                    exit_code: output.exit_code,
                }));
                if output.success {
                    return Ok(());
                }
                let detail = if output.stderr.trim().is_empty() {
                    output.stdout
                } else {
                    output.stderr
                };
                return Err(format!(
                    "command failed (exit {}): {}",
                    output.exit_code,
                    detail.trim()
                ));
            }
            SubEvent::Error(message) => {
                sink.emit(&StreamEvent::now(StreamEventKind::Error {
                    message: message.clone(),
                }));
                return Err(message);
            }
        }
    }
}

fn next_event(
    rx: &Receiver<SubEvent>,
    options: &ExecOptions,
) -> std::result::Result<SubEvent, String> {
    match options.timeout_secs {
        Some(secs) => match rx.recv_timeout(Duration::from_secs(secs)) {
            Ok(event) => Ok(event),
            Err(RecvTimeoutError::Timeout) => {
                Err(format!("step produced no output for {}s", secs))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err("stream closed before completion".to_string())
            }
        },
        None => rx
            .recv()
            .map_err(|_| "stream closed before completion".to_string()),
    }
}

/// Decide and (when applicable) perform the rollback attempt after a
/// critical step failure. The failing step is already in `completed`.
fn handle_critical_failure(
    params: &DeployParams,
    exec: &dyn ExecutionChannel,
    completed: &[Step],
) -> RollbackOutcome {
    if !params.rollback_on_failure {
        return RollbackOutcome::Skipped;
    }
    if completed.is_empty() {
        return RollbackOutcome::NotApplicable;
    }

    let report = rollback::run(&params.app_name, &params.deploy_path, exec);
    if report.all_succeeded() {
        log_status!("rollback", "Rollback completed for {}", params.app_name);
    } else {
        log_status!(
            "rollback",
            "Rollback finished with errors for {}",
            params.app_name
        );
    }
    RollbackOutcome::Attempted
}
