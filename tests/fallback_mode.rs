mod common;

use common::BasicChannel;
use shipmate::{deploy, CancelToken, DeployParams, ErrorCode, NullSink};

#[test]
fn standard_mode_runs_one_combined_command() {
    let channel = BasicChannel::new();

    let report = deploy::run(
        &DeployParams::new("webapp"),
        &channel,
        &NullSink,
        &CancelToken::new(),
    )
    .unwrap();

    assert!(report.success);
    assert!(report.changed);
    assert!(report.degraded);
    assert_eq!(report.data.total_steps, 0);
    assert!(report.data.steps.is_empty());
    assert_eq!(
        report.data.metadata.get("execution_mode").map(String::as_str),
        Some("standard")
    );
    assert_eq!(
        report.data.metadata.get("app").map(String::as_str),
        Some("webapp")
    );
    assert_eq!(
        report.data.metadata.get("version").map(String::as_str),
        Some("latest")
    );

    let calls = channel.executed();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].contains("mkdir -p '/opt/apps/webapp'"));
    assert!(calls[0].contains(".deployed"));
}

#[test]
fn standard_mode_failure_surfaces_remote_command_error() {
    let channel = BasicChannel::failing();

    let err = deploy::run(
        &DeployParams::new("webapp"),
        &channel,
        &NullSink,
        &CancelToken::new(),
    )
    .unwrap_err();

    assert_eq!(err.code, ErrorCode::RemoteCommandFailed);
}

#[test]
fn validation_runs_before_the_fallback_command() {
    let mut params = DeployParams::new("webapp");
    params.deploy_path = "relative/path".to_string();
    let channel = BasicChannel::new();

    let err = deploy::run(&params, &channel, &NullSink, &CancelToken::new()).unwrap_err();

    assert_eq!(err.code, ErrorCode::ValidationInvalidArgument);
    assert!(channel.executed().is_empty());
}
