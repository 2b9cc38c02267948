//! Compensating rollback sequence.
//!
//! Runs after a critical step failure (when enabled): stop the service,
//! restore the most recent backup if one exists, start the service
//! again. Every action executes regardless of the others' outcomes, and
//! nothing here ever raises; the original failure stays the reported
//! cause of the run.

use serde::Serialize;

use crate::catalog;
use crate::channel::{ExecOptions, ExecutionChannel};
use crate::error::Error;
use crate::log_status;
use crate::shell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackOutcome {
    Attempted,
    Skipped,
    NotApplicable,
}

impl RollbackOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RollbackOutcome::Attempted => "attempted",
            RollbackOutcome::Skipped => "skipped",
            RollbackOutcome::NotApplicable => "not_applicable",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackAction {
    pub name: String,
    pub command: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackReport {
    pub actions: Vec<RollbackAction>,
}

impl RollbackReport {
    pub fn all_succeeded(&self) -> bool {
        self.actions.iter().all(|a| a.success)
    }
}

/// Run the fixed compensating sequence, best-effort.
pub fn run(
    app_name: &str,
    deploy_path: &str,
    channel: &dyn ExecutionChannel,
) -> RollbackReport {
    let app = shell::quote_arg(app_name);
    let app_dir = shell::quote_path(&catalog::app_dir(deploy_path, app_name));
    let backup_dir = shell::quote_path(&catalog::backup_dir(deploy_path, app_name));

    let actions: [(&str, String); 3] = [
        ("stop_service", format!("systemctl stop {}", app)),
        (
            "restore_backup",
            format!(
                "if [ -d {backup} ]; then rm -rf {dir} && cp -a {backup} {dir}; fi",
                backup = backup_dir,
                dir = app_dir
            ),
        ),
        ("start_service", format!("systemctl start {}", app)),
    ];

    let mut report = RollbackReport {
        actions: Vec::with_capacity(actions.len()),
    };

    for (name, command) in actions {
        log_status!("rollback", "Running {} for {}", name, app_name);
        let outcome = match channel.execute(&command, &ExecOptions::default()) {
            Ok(output) if output.success => RollbackAction {
                name: name.to_string(),
                command,
                success: true,
                error: None,
            },
            Ok(output) => {
                let detail = if output.stderr.trim().is_empty() {
                    output.stdout
                } else {
                    output.stderr
                };
                failed_action(name, command, format!("exit {}: {}", output.exit_code, detail.trim()))
            }
            Err(err) => failed_action(name, command, err.message),
        };
        report.actions.push(outcome);
    }

    report
}

fn failed_action(name: &str, command: String, error: String) -> RollbackAction {
    // Logged, never escalated.
    let err = Error::rollback_action_failed(name, command.clone(), error.clone());
    log_status!("rollback", "{}", err.message);

    RollbackAction {
        name: name.to_string(),
        command,
        success: false,
        error: Some(error),
    }
}
