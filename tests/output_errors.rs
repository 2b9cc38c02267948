use shipmate::output::{map_cmd_result_to_json, CliResponse};
use shipmate::Error;

#[test]
fn critical_step_failure_serializes_step_and_rollback_outcome() {
    let err = Error::critical_step_failed(
        "download_app",
        "Download Application",
        "command failed (exit 22): curl: (22) 404",
        "attempted",
        3,
    );

    let json = CliResponse::<()>::from_error(&err).to_json().unwrap();

    assert!(json.contains("\"code\": \"step.critical_failed\""));
    assert!(json.contains("Download Application"));
    assert!(json.contains("\"rollback\": \"attempted\""));
    assert!(json.contains("\"completedSteps\": 3"));
}

#[test]
fn critical_step_failure_maps_to_exit_code_20() {
    let err = Error::critical_step_failed("start_service", "Start Service", "exit 1", "skipped", 6);

    let (_value, exit_code) = map_cmd_result_to_json::<serde_json::Value>(Err(err));

    assert_eq!(exit_code, 20);
}

#[test]
fn validation_error_maps_to_exit_code_2() {
    let err = Error::validation_invalid_argument(
        "deployPath",
        "Deploy path must be absolute: apps",
        None,
        None,
    );

    let (_value, exit_code) = map_cmd_result_to_json::<serde_json::Value>(Err(err));

    assert_eq!(exit_code, 2);
}

#[test]
fn ssh_identity_error_maps_to_exit_code_10() {
    let err = Error::ssh_identity_file_not_found("/home/deploy/.ssh/id_ed25519");

    let (_value, exit_code) = map_cmd_result_to_json::<serde_json::Value>(Err(err));

    assert_eq!(exit_code, 10);
}

#[test]
fn hints_are_included_in_the_envelope() {
    let err = Error::validation_invalid_argument("path", "Deploy path must be absolute", None, None)
        .with_hint("Pass an absolute directory, e.g. --path /opt/apps");

    let json = CliResponse::<()>::from_error(&err).to_json().unwrap();

    assert!(json.contains("Pass an absolute directory"));
}

#[test]
fn success_envelope_wraps_data() {
    let json = CliResponse::success(serde_json::json!({ "totalSteps": 8 }))
        .to_json()
        .unwrap();

    assert!(json.contains("\"success\": true"));
    assert!(json.contains("\"totalSteps\": 8"));
}
