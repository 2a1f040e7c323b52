mod common;

use std::path::PathBuf;

use serde_json::{Value, json};

use common::run_command;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(path)
}

// ============================================================================
// version command
// ============================================================================

#[test]
fn version_human() {
    let output = run_command(&["version"]);
    assert!(
        output.status.success(),
        "version should exit 0: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("eop-api"), "unexpected output: {stdout}");
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn version_json() {
    let output = run_command(&["version", "--format", "json"]);
    assert!(output.status.success());
    let parsed: Value = serde_json::from_slice(&output.stdout).expect("version JSON should be valid");
    assert_eq!(parsed["name"], "eop-api");
    assert_eq!(parsed["version"], env!("CARGO_PKG_VERSION"));
}

// ============================================================================
// export command
// ============================================================================

#[test]
fn export_merges_fixture_session() {
    let out = tempfile::tempdir().unwrap();
    let output = run_command(&[
        "--quiet",
        "export",
        "--data-dir",
        fixture("store").to_str().unwrap(),
        "--session",
        "fixture-session",
        "--output",
        out.path().to_str().unwrap(),
    ]);
    assert!(
        output.status.success(),
        "export should exit 0: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let expected_path = out.path().join("Payments Service.json");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), expected_path.display().to_string());

    let exported: Value = serde_json::from_slice(&std::fs::read(&expected_path).unwrap()).unwrap();
    let cells = &exported["detail"]["diagrams"][0]["diagramJson"]["cells"];
    assert_eq!(
        cells[0]["threats"],
        json!([
            { "status": "Mitigated", "title": "Existing threat", "type": "Spoofing" },
            {
                "status": "Open",
                "severity": "High",
                "id": "T1",
                "methodology": "STRIDE",
                "type": "Tampering",
                "title": "Log tampering",
                "description": "Audit records can be rewritten by the worker.",
                "mitigation": "Append-only log storage",
                "owner": "Bob",
                "game": "fixture-session"
            },
            {
                "status": "Open",
                "severity": "Medium",
                "id": "T2",
                "methodology": "STRIDE",
                "type": "Elevation of privilege",
                "title": "Privilege escalation",
                "owner": "Alice",
                "game": "fixture-session"
            }
        ])
    );
    // Cells without identified threats keep their shape.
    assert_eq!(cells[1], json!({ "id": "flow-2", "type": "tm.Flow" }));

    // The fixture store itself is not modified.
    let stored: Value = serde_json::from_slice(
        &std::fs::read(fixture("store/elevationOfPrivilege/fixture-session/model.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(
        stored["detail"]["diagrams"][0]["diagramJson"]["cells"][0]["threats"]
            .as_array()
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn export_unknown_session_exits_with_store_error() {
    let out = tempfile::tempdir().unwrap();
    let output = run_command(&[
        "export",
        "--data-dir",
        fixture("store").to_str().unwrap(),
        "--session",
        "missing-session",
        "--output",
        out.path().to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(5));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "unexpected stderr: {stderr}");
}

#[test]
fn export_missing_data_dir_is_usage_error() {
    let output = run_command(&[
        "export",
        "--data-dir",
        "/definitely/not/a/store",
        "--session",
        "s1",
    ]);
    assert_eq!(output.status.code(), Some(64));
}

// ============================================================================
// serve command
// ============================================================================

#[test]
fn serve_with_invalid_config_exits_with_config_error() {
    let output = run_command(&[
        "serve",
        "--config",
        fixture("invalid_config.yaml").to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("lobby.url"), "unexpected stderr: {stderr}");
}

#[test]
fn serve_with_missing_config_exits_with_config_error() {
    let output = run_command(&["serve", "--config", "/definitely/not/here.yaml"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn serve_with_unbindable_address_exits_with_io_error() {
    let output = run_command(&["serve", "--memory", "--bind", "203.0.113.1:1"]);
    assert_eq!(output.status.code(), Some(3));
}

// ============================================================================
// configuration file
// ============================================================================

#[test]
fn sample_config_loads_with_env_default() {
    use eop_api::config::{ConfigLoader, StorageBackend};

    let result = ConfigLoader::default()
        .load(&fixture("config.yaml"))
        .expect("sample config should load");
    assert!(result.warnings.is_empty());
    assert_eq!(result.config.api.bind, "127.0.0.1:0");
    assert_eq!(result.config.lobby.timeout_ms, 5000);
    assert_eq!(result.config.storage.backend, StorageBackend::Memory);
    if std::env::var_os("EOP_TEST_LOBBY_URL").is_none() {
        assert_eq!(result.config.lobby.url, "http://localhost:8002");
    }
}
