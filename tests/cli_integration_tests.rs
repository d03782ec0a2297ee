//! Command-line surface tests: argument parsing and command dispatch.
//! Testing library/framework: Rust built-in test framework with Tokio async runtime (#[tokio::test]).

use clap::Parser;
use feature_registry::cli::{commands, Cli};
use feature_registry::registry::{FeatureStore, RegistryError};

async fn run(store: &FeatureStore, args: &[&str]) -> Result<serde_json::Value, RegistryError> {
    let mut argv = vec!["feature-registry"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).expect("arguments should parse");
    commands::execute(cli.command, store)
        .await
        .map(|output| serde_json::to_value(output).expect("command output should serialize"))
}

#[test]
fn help_lists_workflow_commands() {
    let err = Cli::try_parse_from(["feature-registry", "--help"]).unwrap_err();
    let help = err.to_string();
    for command in ["create", "submit", "test", "approve", "reject", "fix", "deploy"] {
        assert!(help.contains(command), "help should mention {command}");
    }
}

#[test]
fn create_requires_role() {
    let result = Cli::try_parse_from([
        "feature-registry",
        "create",
        "--name",
        "a:b:1",
        "--feature-type",
        "batch",
        "--data-type",
        "int",
        "--query",
        "SELECT 1",
        "--description",
        "one",
        "--created-by",
        "dev1",
    ]);
    assert!(result.is_err());
}

#[tokio::test]
async fn full_workflow_through_commands() {
    let store = FeatureStore::in_memory().await;

    let created = run(
        &store,
        &[
            "create",
            "--role",
            "developer",
            "--name",
            "users:age:v1",
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
        ],
    )
    .await
    .unwrap();
    assert_eq!(created["status"], "DRAFT");
    assert_eq!(created["feature_data_type"], "int");

    let submitted = run(
        &store,
        &["submit", "--role", "developer", "--name", "users:age:v1", "--submitted-by", "dev1"],
    )
    .await
    .unwrap();
    assert_eq!(submitted["status"], "READY_FOR_TESTING");

    let tested = run(
        &store,
        &[
            "test",
            "--role",
            "external_testing_system",
            "--name",
            "users:age:v1",
            "--result",
            "TEST_SUCCEEDED",
            "--tested-by",
            "ci",
        ],
    )
    .await
    .unwrap();
    assert_eq!(tested["status"], "TEST_SUCCEEDED");

    let approved = run(
        &store,
        &["approve", "--role", "approver", "--name", "users:age:v1", "--approved-by", "lead"],
    )
    .await
    .unwrap();
    assert_eq!(approved["status"], "DEPLOYED");

    let listed = run(&store, &["list", "--role", "tester", "--status", "DEPLOYED"])
        .await
        .unwrap();
    assert!(listed.get("users:age:v1").is_some());
}

#[tokio::test]
async fn validation_errors_render_every_field() {
    let store = FeatureStore::in_memory().await;
    let err = run(
        &store,
        &[
            "create",
            "--role",
            "developer",
            "--name",
            "users:age:v01",
            "--feature-type",
            "stream",
            "--data-type",
            "int",
            "--query",
            "DROP TABLE users",
            "--description",
            "User age",
            "--created-by",
            "dev1",
        ],
    )
    .await
    .unwrap_err();

    let body = commands::error_body(&err);
    assert_eq!(body["error"], "validation_failed");
    assert_eq!(body["status"], 400);
    let fields = body["fields"].as_object().unwrap();
    assert!(fields.contains_key("feature_name"));
    assert!(fields.contains_key("feature_type"));
    assert!(fields.contains_key("query"));
}

#[tokio::test]
async fn get_unknown_feature_maps_to_not_found() {
    let store = FeatureStore::in_memory().await;
    let err = run(&store, &["get", "--name", "x:y:1"]).await.unwrap_err();
    assert_eq!(commands::error_body(&err)["status"], 404);
}
