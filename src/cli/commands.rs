use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::Commands;
use crate::registry::*;

/// What a command hands back for printing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandOutput {
    Feature(FeatureRecord),
    Features(BTreeMap<String, FeatureRecord>),
}

/// Run one command against `store`.
pub async fn execute(
    command: Commands,
    store: &FeatureStore,
) -> Result<CommandOutput, RegistryError> {
    let record = match command {
        Commands::Get { name, role } => store.get(&name, role.as_deref()).await?,
        Commands::List {
            role,
            name,
            feature_type,
            data_type,
            description,
            status,
            created_by,
            last_updated_by,
        } => {
            let filters = FeatureFilters {
                feature_name: name,
                feature_type,
                feature_data_type: data_type,
                description,
                status,
                created_by,
                last_updated_by,
            };
            return Ok(CommandOutput::Features(store.list(&role, &filters).await?));
        }
        Commands::Create {
            role,
            name,
            feature_type,
            data_type,
            query,
            description,
            created_by,
        } => {
            let payload = CreateFeature {
                feature_name: name,
                feature_type,
                feature_data_type: data_type,
                query,
                description,
                created_by,
            };
            store.create(payload, &role).await?
        }
        Commands::Update {
            role,
            name,
            updated_by,
            feature_type,
            data_type,
            query,
            description,
        } => {
            let payload = UpdateFeature {
                feature_name: name,
                last_updated_by: updated_by,
                feature_type,
                feature_data_type: data_type,
                query,
                description,
            };
            store.update(payload, &role).await?
        }
        Commands::Delete {
            role,
            name,
            deleted_by,
            reason,
        } => {
            let payload = DeleteFeature {
                feature_name: name,
                deleted_by,
                deletion_reason: reason,
            };
            store.delete(payload, &role).await?
        }
        Commands::Submit {
            role,
            name,
            submitted_by,
        } => {
            let payload = SubmitForTesting {
                feature_name: name,
                submitted_by,
            };
            store.submit_for_testing(payload, &role).await?
        }
        Commands::Test {
            role,
            name,
            result,
            tested_by,
            notes,
        } => {
            let payload = RecordTest {
                feature_name: name,
                test_result: result,
                tested_by,
                test_notes: notes,
            };
            store.record_test(payload, &role).await?
        }
        Commands::Approve {
            role,
            name,
            approved_by,
            notes,
        } => {
            let payload = ApproveFeature {
                feature_name: name,
                approved_by,
                approval_notes: notes,
            };
            store.approve(payload, &role).await?
        }
        Commands::Reject {
            role,
            name,
            rejected_by,
            reason,
        } => {
            let payload = RejectFeature {
                feature_name: name,
                rejected_by,
                rejection_reason: reason,
            };
            store.reject(payload, &role).await?
        }
        Commands::Fix {
            role,
            name,
            updated_by,
        } => {
            let payload = FixFeature {
                feature_name: name,
                last_updated_by: updated_by,
            };
            store.fix(payload, &role).await?
        }
        Commands::Deploy {
            role,
            name,
            deployed_by,
        } => {
            let payload = DeployFeature {
                feature_name: name,
                deployed_by,
            };
            store.deploy(payload, &role).await?
        }
    };
    Ok(CommandOutput::Feature(record))
}

/// Error body printed by the binary on failure.
pub fn error_body(error: &RegistryError) -> Value {
    let mut body = serde_json::json!({
        "error": error.kind(),
        "status": error.status_code(),
        "message": error.to_string(),
    });
    if let RegistryError::ValidationFailed { errors } = error {
        body["fields"] = serde_json::json!(errors);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_command(name: &str) -> Commands {
        Commands::Create {
            role: "developer".to_string(),
            name: name.to_string(),
            feature_type: "batch".to_string(),
            data_type: "int".to_string(),
            query: "SELECT 1".to_string(),
            description: "one".to_string(),
            created_by: "dev1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_single_record_renders_without_wrapper() {
        let store = FeatureStore::in_memory().await;
        let output = execute(create_command("a:b:1"), &store).await.unwrap();
        assert!(matches!(output, CommandOutput::Feature(_)));

        let rendered = serde_json::to_value(&output).unwrap();
        assert_eq!(rendered["feature_name"], "a:b:1");
        assert_eq!(rendered["status"], "DRAFT");
    }

    #[tokio::test]
    async fn test_listing_renders_as_name_keyed_object() {
        let store = FeatureStore::in_memory().await;
        execute(create_command("a:b:1"), &store).await.unwrap();
        execute(create_command("a:b:2"), &store).await.unwrap();

        let listing = Commands::List {
            role: "tester".to_string(),
            name: None,
            feature_type: None,
            data_type: None,
            description: None,
            status: None,
            created_by: None,
            last_updated_by: None,
        };
        let output = execute(listing, &store).await.unwrap();
        let rendered = serde_json::to_value(&output).unwrap();
        let object = rendered.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(object["a:b:2"]["status"], "DRAFT");
    }

    #[test]
    fn test_persistence_errors_map_to_server_status() {
        let err = RegistryError::Persistence(crate::persistence::PersistenceError::Corrupt {
            reason: "bad".to_string(),
        });
        let body = error_body(&err);
        assert_eq!(body["error"], "persistence_failure");
        assert_eq!(body["status"], 500);
    }
}
