//! Tests that drive the compiled `feature-registry` binary.
//!
//! Covers what only the binary decides:
//! - exit codes (2 for rejected requests, 1 for storage failures)
//! - the JSON record on stdout and the JSON error body on stderr
//! - metadata path selection from `--metadata-path`, `--config` and the environment
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

fn registry(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("feature-registry").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env_remove("FEATURE_REGISTRY__STORAGE__METADATA_PATH")
        .env("FEATURE_REGISTRY__OBSERVABILITY__LOG_LEVEL", "off");
    cmd
}

fn create_args(name: &str) -> Vec<String> {
    [
        "create",
        "--role",
        "developer",
        "--name",
        name,
        "--feature-type",
        "batch",
        "--data-type",
        "int",
        "--query",
        "SELECT age FROM users",
        "--description",
        "User age",
        "--created-by",
        "dev1",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).expect("output should be JSON")
}

#[test]
fn test_create_and_get_print_record_json() {
    let dir = TempDir::new().unwrap();

    let created = registry(&dir)
        .arg("--metadata-path")
        .arg("meta.json")
        .args(create_args("users:age:v1"))
        .assert()
        .success();
    let record = json(&created.get_output().stdout);
    assert_eq!(record["status"], "DRAFT");
    assert_eq!(record["feature_name"], "users:age:v1");
    assert!(dir.path().join("meta.json").exists());

    let fetched = registry(&dir)
        .args(["--metadata-path", "meta.json", "get", "--name", "users:age:v1"])
        .assert()
        .success();
    assert_eq!(json(&fetched.get_output().stdout), record);
}

#[test]
fn test_unknown_feature_exits_2_with_error_body() {
    let dir = TempDir::new().unwrap();

    let assert = registry(&dir)
        .args(["--metadata-path", "meta.json", "get", "--name", "x:y:1"])
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("not_found"));
    let body = json(&assert.get_output().stderr);
    assert_eq!(body["status"], 404);
    assert_eq!(body["message"], "Feature x:y:1 not found");
}

#[test]
fn test_validation_failure_lists_fields() {
    let dir = TempDir::new().unwrap();

    let mut args = create_args("users:age:v01");
    args[6] = "stream".to_string();
    let assert = registry(&dir)
        .arg("--metadata-path")
        .arg("meta.json")
        .args(args)
        .assert()
        .code(2);
    let body = json(&assert.get_output().stderr);
    assert_eq!(body["error"], "validation_failed");
    assert!(body["fields"].get("feature_name").is_some());
    assert!(body["fields"].get("feature_type").is_some());
    assert!(!dir.path().join("meta.json").exists());
}

#[test]
fn test_unknown_role_exits_2() {
    let dir = TempDir::new().unwrap();

    registry(&dir)
        .args(["--metadata-path", "meta.json", "list", "--role", "auditor"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unauthorized"));
}

#[test]
fn test_storage_failure_exits_1() {
    let dir = TempDir::new().unwrap();
    // a plain file where the metadata directory should be
    std::fs::write(dir.path().join("blocker"), b"").unwrap();

    let assert = registry(&dir)
        .arg("--metadata-path")
        .arg("blocker/meta.json")
        .args(create_args("users:age:v1"))
        .assert()
        .code(1);
    let body = json(&assert.get_output().stderr);
    assert_eq!(body["error"], "persistence_failure");
    assert_eq!(body["status"], 500);
}

#[test]
fn test_config_file_selects_metadata_path() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("registry.toml");
    std::fs::write(
        &config_path,
        "[storage]\nmetadata_path = \"from-config/meta.json\"\npretty_json = false\n",
    )
    .unwrap();

    registry(&dir)
        .arg("--config")
        .arg(&config_path)
        .args(create_args("users:age:v1"))
        .assert()
        .success();

    let stored = std::fs::read_to_string(dir.path().join("from-config/meta.json")).unwrap();
    assert!(!stored.contains('\n'), "pretty_json = false should write one line");
    assert_eq!(json(stored.as_bytes())["users:age:v1"]["status"], "DRAFT");
}

#[test]
fn test_environment_and_flag_precedence() {
    let dir = TempDir::new().unwrap();

    registry(&dir)
        .env("FEATURE_REGISTRY__STORAGE__METADATA_PATH", "from-env.json")
        .args(create_args("users:age:v1"))
        .assert()
        .success();
    assert!(dir.path().join("from-env.json").exists());

    registry(&dir)
        .env("FEATURE_REGISTRY__STORAGE__METADATA_PATH", "from-env.json")
        .args(["--metadata-path", "from-flag.json"])
        .args(create_args("users:age:v2"))
        .assert()
        .success();
    assert!(dir.path().join("from-flag.json").exists());

    let from_env = json(&std::fs::read(dir.path().join("from-env.json")).unwrap());
    assert!(from_env.get("users:age:v2").is_none());
}
