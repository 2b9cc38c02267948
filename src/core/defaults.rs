//! Built-in deployment defaults.
//!
//! These are compile-time fallbacks; per-run values come from
//! [`DeployParams`](crate::catalog::DeployParams).

pub const DEFAULT_VERSION: &str = "latest";
pub const DEFAULT_DEPLOY_PATH: &str = "/opt/apps";

/// Base URL application packages are fetched from when the caller does
/// not override it.
pub const DEFAULT_ARTIFACT_BASE: &str = "https://releases.shipmate.dev";

/// Idle timeout while waiting for the next streamed sub-event of a step.
pub const STEP_TIMEOUT_SECS: u64 = 600;
