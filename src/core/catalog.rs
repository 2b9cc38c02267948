//! Deployment step catalog.
//!
//! [`build_catalog`] turns a validated [`DeployParams`] into the fixed,
//! ordered step plan for one run. The builder is pure: same parameters
//! always produce the same catalog, which the pipeline and the rollback
//! controller both depend on.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};
use crate::shell;
use crate::utils::validation;

/// Parameters for a deployment run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployParams {
    pub app_name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_deploy_path")]
    pub deploy_path: String,
    #[serde(default = "default_artifact_base")]
    pub artifact_base: String,
    #[serde(default = "default_true")]
    pub health_check: bool,
    #[serde(default = "default_true")]
    pub rollback_on_failure: bool,
}

fn default_version() -> String {
    defaults::DEFAULT_VERSION.to_string()
}

fn default_deploy_path() -> String {
    defaults::DEFAULT_DEPLOY_PATH.to_string()
}

fn default_artifact_base() -> String {
    defaults::DEFAULT_ARTIFACT_BASE.to_string()
}

fn default_true() -> bool {
    true
}

impl DeployParams {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            version: default_version(),
            deploy_path: default_deploy_path(),
            artifact_base: default_artifact_base(),
            health_check: true,
            rollback_on_failure: true,
        }
    }

    /// Validate parameters before any command is issued.
    pub fn validate(&self) -> Result<()> {
        validation::require_non_empty(&self.app_name, "appName", "App name cannot be empty")?;

        let name_pattern = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$")
            .map_err(|e| Error::internal_unexpected(e.to_string()))?;
        if !name_pattern.is_match(&self.app_name) {
            return Err(Error::validation_invalid_argument(
                "appName",
                "App name may only contain letters, digits, dots, dashes and underscores",
                Some(self.app_name.clone()),
                None,
            ));
        }

        if !self.deploy_path.starts_with('/') {
            return Err(Error::validation_invalid_argument(
                "deployPath",
                format!("Deploy path must be absolute: {}", self.deploy_path),
                None,
                None,
            ));
        }

        validation::require_non_empty(&self.version, "version", "Version cannot be empty")?;

        Ok(())
    }

    pub fn app_dir(&self) -> String {
        app_dir(&self.deploy_path, &self.app_name)
    }

    pub fn backup_dir(&self) -> String {
        backup_dir(&self.deploy_path, &self.app_name)
    }

    pub fn artifact_name(&self) -> String {
        format!("{}-{}.tar.gz", self.app_name, self.version)
    }
}

pub(crate) fn app_dir(deploy_path: &str, app_name: &str) -> String {
    format!("{}/{}", deploy_path.trim_end_matches('/'), app_name)
}

pub(crate) fn backup_dir(deploy_path: &str, app_name: &str) -> String {
    format!("{}.backup", app_dir(deploy_path, app_name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

/// One planned unit of work in a deployment run.
///
/// The catalog builder creates steps as Pending; only the pipeline
/// mutates status and timestamps, exactly once per terminal transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    pub name: String,
    pub description: String,
    pub command: String,
    pub critical: bool,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl Step {
    fn new(
        id: &str,
        name: &str,
        description: String,
        command: String,
        critical: bool,
        params: &DeployParams,
    ) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("app".to_string(), params.app_name.clone());
        metadata.insert("version".to_string(), params.version.clone());

        Self {
            id: id.to_string(),
            name: name.to_string(),
            description,
            command,
            critical,
            status: StepStatus::Pending,
            started_at: None,
            finished_at: None,
            duration_ms: None,
            metadata,
        }
    }

    pub(crate) fn mark_running(&mut self, now: DateTime<Utc>) {
        self.status = StepStatus::Running;
        self.started_at = Some(now);
    }

    pub(crate) fn finish(&mut self, status: StepStatus, now: DateTime<Utc>) {
        self.status = status;
        self.finished_at = Some(now);
        if let Some(started_at) = self.started_at {
            self.duration_ms = Some((now - started_at).num_milliseconds());
        }
    }
}

/// Build the ordered step plan for one deployment run.
///
/// The base sequence is fixed; the health check is appended last iff
/// `params.health_check` is set. Every step except the backup is
/// critical.
pub fn build_catalog(params: &DeployParams) -> Vec<Step> {
    let app = shell::quote_arg(&params.app_name);
    let deploy_path = shell::quote_path(&params.deploy_path);
    let app_dir = shell::quote_path(&params.app_dir());
    let backup_dir = shell::quote_path(&params.backup_dir());
    let artifact = shell::quote_path(&format!("{}/{}", params.app_dir(), params.artifact_name()));
    let artifact_url = shell::quote_arg(&format!(
        "{}/{}/{}/{}",
        params.artifact_base.trim_end_matches('/'),
        params.app_name,
        params.version,
        params.artifact_name()
    ));
    let config_file = shell::quote_path(&format!("{}/app.conf", params.app_dir()));

    let mut steps = vec![
        Step::new(
            "validate_environment",
            "Validate Environment",
            format!("Check that {} exists and is writable", params.deploy_path),
            format!("test -d {} && test -w {}", deploy_path, deploy_path),
            true,
            params,
        ),
        Step::new(
            "backup_current",
            "Backup Current Version",
            format!("Copy any existing deployment of {} aside", params.app_name),
            format!(
                "if [ -d {dir} ]; then rm -rf {backup} && cp -a {dir} {backup}; fi",
                dir = app_dir,
                backup = backup_dir
            ),
            false,
            params,
        ),
        Step::new(
            "download_app",
            "Download Application",
            format!("Fetch {} {}", params.app_name, params.version),
            format!(
                "mkdir -p {} && curl -fsSL -o {} {}",
                app_dir, artifact, artifact_url
            ),
            true,
            params,
        ),
        Step::new(
            "extract_package",
            "Extract Package",
            format!("Unpack {}", params.artifact_name()),
            format!(
                "cd {} && tar -xzf {} && rm -f {}",
                app_dir, artifact, artifact
            ),
            true,
            params,
        ),
        Step::new(
            "configure_app",
            "Configure Application",
            format!("Write deployment configuration for {}", params.app_name),
            format!(
                "printf 'app=%s\\nversion=%s\\n' {} {} > {}",
                app,
                shell::quote_arg(&params.version),
                config_file
            ),
            true,
            params,
        ),
        Step::new(
            "set_permissions",
            "Set Permissions",
            format!("Normalize ownership and modes under {}", params.app_dir()),
            format!("chmod -R u+rwX,g+rX,o+rX {}", app_dir),
            true,
            params,
        ),
        Step::new(
            "start_service",
            "Start Service",
            format!("Restart the {} service", params.app_name),
            format!("systemctl restart {}", app),
            true,
            params,
        ),
    ];

    if params.health_check {
        steps.push(Step::new(
            "health_check",
            "Health Check",
            format!("Verify the {} service is active", params.app_name),
            format!("systemctl is-active --quiet {}", app),
            true,
            params,
        ));
    }

    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> DeployParams {
        DeployParams::new("webapp")
    }

    #[test]
    fn catalog_is_deterministic() {
        let first = build_catalog(&params());
        let second = build_catalog(&params());

        let ids: Vec<&str> = first.iter().map(|s| s.id.as_str()).collect();
        let ids_again: Vec<&str> = second.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ids_again);

        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.command, b.command);
            assert_eq!(a.critical, b.critical);
        }
    }

    #[test]
    fn catalog_order_is_fixed() {
        let steps = build_catalog(&params());
        let ids: Vec<&str> = steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "validate_environment",
                "backup_current",
                "download_app",
                "extract_package",
                "configure_app",
                "set_permissions",
                "start_service",
                "health_check",
            ]
        );
    }

    #[test]
    fn only_backup_is_non_critical() {
        let steps = build_catalog(&params());
        for step in &steps {
            assert_eq!(step.critical, step.id != "backup_current", "{}", step.id);
        }
    }

    #[test]
    fn health_check_is_last_and_optional() {
        let with = build_catalog(&params());
        assert_eq!(with.last().map(|s| s.id.as_str()), Some("health_check"));

        let mut p = params();
        p.health_check = false;
        let without = build_catalog(&p);
        assert_eq!(without.len(), 7);
        assert!(!without.iter().any(|s| s.id == "health_check"));
    }

    #[test]
    fn commands_quote_paths_with_spaces() {
        let mut p = params();
        p.deploy_path = "/opt/app dir".to_string();
        let steps = build_catalog(&p);
        assert!(steps[0].command.contains("'/opt/app dir'"));
    }

    #[test]
    fn steps_carry_app_metadata() {
        let steps = build_catalog(&params());
        for step in &steps {
            assert_eq!(step.metadata.get("app").map(String::as_str), Some("webapp"));
            assert_eq!(
                step.metadata.get("version").map(String::as_str),
                Some("latest")
            );
        }
    }

    #[test]
    fn validate_rejects_empty_app_name() {
        let mut p = params();
        p.app_name = String::new();
        assert!(p.validate().is_err());
    }

    #[test]
    fn validate_rejects_relative_deploy_path() {
        let mut p = params();
        p.deploy_path = "opt/apps".to_string();
        assert!(p.validate().is_err());
    }

    #[test]
    fn validate_rejects_shell_hostile_app_name() {
        let mut p = params();
        p.app_name = "web;rm -rf /".to_string();
        assert!(p.validate().is_err());
    }

    #[test]
    fn params_default_from_json() {
        let p: DeployParams = serde_json::from_str(r#"{"appName":"webapp"}"#).unwrap();
        assert_eq!(p.version, "latest");
        assert_eq!(p.deploy_path, "/opt/apps");
        assert!(p.health_check);
        assert!(p.rollback_on_failure);
    }
}
