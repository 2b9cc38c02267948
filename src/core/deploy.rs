//! High-level deployment entry point.
//!
//! Validates parameters, builds the catalog, and dispatches once on the
//! channel's streaming capability: streaming channels get the full
//! step pipeline, everything else degrades to a single combined command
//! with weaker observability.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::catalog::{build_catalog, DeployParams};
use crate::channel::{CancelToken, ExecOptions, ExecutionChannel};
use crate::error::{Error, RemoteCommandFailedDetails, Result};
use crate::pipeline;
use crate::progress::EventSink;
use crate::report::{RunData, RunReport};
use crate::shell;

/// Run a deployment against the given channel.
///
/// Parameters are validated before any command is issued; a validation
/// failure never touches the target.
pub fn run(
    params: &DeployParams,
    channel: &dyn ExecutionChannel,
    sink: &dyn EventSink,
    cancel: &CancelToken,
) -> Result<RunReport> {
    params.validate()?;

    match channel.streaming() {
        Some(stream) => {
            let catalog = build_catalog(params);
            pipeline::run_catalog(catalog, params, channel, stream, sink, cancel)
        }
        None => run_standard(params, channel),
    }
}

/// Fallback for channels without streaming: one combined blocking
/// command, no per-step tracking, no rollback, no progress events.
fn run_standard(params: &DeployParams, channel: &dyn ExecutionChannel) -> Result<RunReport> {
    let started_at = Utc::now();
    let app_dir = params.app_dir();
    let marker = format!("{}/.deployed", app_dir);

    let command = format!(
        "mkdir -p {} && printf '%s\\n' {} > {}",
        shell::quote_path(&app_dir),
        shell::quote_arg(&params.version),
        shell::quote_path(&marker)
    );

    let output = channel.execute(&command, &ExecOptions::default())?;
    if !output.success {
        return Err(Error::remote_command_failed(RemoteCommandFailedDetails {
            command,
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        }));
    }

    let finished_at = Utc::now();
    let mut metadata = HashMap::new();
    metadata.insert("app".to_string(), params.app_name.clone());
    metadata.insert("version".to_string(), params.version.clone());
    metadata.insert("deployPath".to_string(), params.deploy_path.clone());
    metadata.insert("execution_mode".to_string(), "standard".to_string());

    Ok(RunReport {
        run_id: Uuid::new_v4().to_string(),
        success: true,
        changed: true,
        degraded: true,
        message: format!(
            "Deployed {} {} in standard mode (no streaming channel)",
            params.app_name, params.version
        ),
        started_at,
        finished_at,
        duration_ms: (finished_at - started_at).num_milliseconds(),
        data: RunData {
            total_steps: 0,
            completed_steps: 0,
            failed_steps: 0,
            steps: Vec::new(),
            metadata,
        },
    })
}
