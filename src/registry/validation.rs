use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::errors::RegistryError;
use super::types::{CreateFeature, FeatureDataType, FeatureType, UpdateFeature};

/// `category:name:version`, version with no leading zero and optional `v`.
static FEATURE_NAME: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*:[A-Za-z_][A-Za-z0-9_]*:v?[1-9][0-9]*$")
});

const FORBIDDEN_QUERY_PREFIXES: [&str; 2] = ["drop", "delete"];

pub fn is_valid_feature_name(name: &str) -> bool {
    match FEATURE_NAME.as_ref() {
        Ok(re) => re.is_match(name),
        Err(_) => false,
    }
}

fn check_feature_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("must not be empty".to_string());
    }
    if !is_valid_feature_name(name) {
        return Err(
            "must match category:name:version (e.g. 'user:age:v1'); version must not have a leading zero"
                .to_string(),
        );
    }
    Ok(())
}

fn check_query(query: &str) -> Result<(), String> {
    let normalized = query.trim().to_lowercase();
    if normalized.is_empty() {
        return Err("must not be empty".to_string());
    }
    if FORBIDDEN_QUERY_PREFIXES
        .iter()
        .any(|prefix| normalized.starts_with(prefix))
    {
        return Err("must not start with DROP or DELETE".to_string());
    }
    Ok(())
}

fn check_non_empty(value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err("must not be empty".to_string())
    } else {
        Ok(())
    }
}

/// Collects one reason per failing field.
#[derive(Default)]
struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    fn check(&mut self, field: &str, result: Result<(), String>) {
        if let Err(reason) = result {
            self.0.insert(field.to_string(), reason);
        }
    }

    fn parse<T>(&mut self, field: &str, result: Result<T, String>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(reason) => {
                self.0.insert(field.to_string(), reason);
                None
            }
        }
    }

    fn finish(self) -> Result<(), RegistryError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::ValidationFailed { errors: self.0 })
        }
    }
}

/// Validated typed values from a create payload.
#[derive(Debug)]
pub struct ValidatedCreate {
    pub feature_type: FeatureType,
    pub feature_data_type: FeatureDataType,
}

pub fn validate_create(payload: &CreateFeature) -> Result<ValidatedCreate, RegistryError> {
    let mut errors = FieldErrors::default();
    errors.check("feature_name", check_feature_name(&payload.feature_name));
    let feature_type = errors.parse("feature_type", payload.feature_type.parse::<FeatureType>());
    let feature_data_type = errors.parse(
        "feature_data_type",
        payload.feature_data_type.parse::<FeatureDataType>(),
    );
    errors.check("query", check_query(&payload.query));
    errors.check("description", check_non_empty(&payload.description));
    errors.check("created_by", check_non_empty(&payload.created_by));
    errors.finish()?;

    match (feature_type, feature_data_type) {
        (Some(feature_type), Some(feature_data_type)) => Ok(ValidatedCreate {
            feature_type,
            feature_data_type,
        }),
        _ => Err(RegistryError::validation("feature_type", "could not be parsed")),
    }
}

/// Validated typed values from an update payload; `None` means not supplied.
#[derive(Debug, Default)]
pub struct ValidatedUpdate {
    pub feature_type: Option<FeatureType>,
    pub feature_data_type: Option<FeatureDataType>,
}

pub fn validate_update(payload: &UpdateFeature) -> Result<ValidatedUpdate, RegistryError> {
    let mut errors = FieldErrors::default();
    errors.check("last_updated_by", check_non_empty(&payload.last_updated_by));
    let feature_type = payload
        .feature_type
        .as_deref()
        .and_then(|value| errors.parse("feature_type", value.parse::<FeatureType>()));
    let feature_data_type = payload
        .feature_data_type
        .as_deref()
        .and_then(|value| errors.parse("feature_data_type", value.parse::<FeatureDataType>()));
    if let Some(query) = payload.query.as_deref() {
        errors.check("query", check_query(query));
    }
    if let Some(description) = payload.description.as_deref() {
        errors.check("description", check_non_empty(description));
    }
    errors.finish()?;

    Ok(ValidatedUpdate {
        feature_type,
        feature_data_type,
    })
}

/// Single required free-text field, e.g. a rejection or deletion reason.
pub fn require_non_empty(field: &str, value: &str) -> Result<(), RegistryError> {
    check_non_empty(value).map_err(|reason| RegistryError::validation(field, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> CreateFeature {
        CreateFeature {
            feature_name: "user:age:v1".to_string(),
            feature_type: "batch".to_string(),
            feature_data_type: "integer".to_string(),
            query: "SELECT age FROM users".to_string(),
            description: "Age of the user".to_string(),
            created_by: "alice".to_string(),
        }
    }

    #[test]
    fn test_feature_name_grammar() {
        for ok in ["a:b:1", "user:age:v1", "_x:y_2:v10", "A1:B2:42"] {
            assert!(is_valid_feature_name(ok), "{ok} should be valid");
        }
        for bad in [
            "a:b", "a:b:c:1", "a:b:0", "a:b:v0", "a:b:v", "a:b:01", "a:b:v01", "1a:b:1",
            "a-b:c:1", "a::1", "a:b:1.0", "",
        ] {
            assert!(!is_valid_feature_name(bad), "{bad} should be invalid");
        }
    }

    #[test]
    fn test_valid_create_payload() {
        let validated = validate_create(&payload()).unwrap();
        assert_eq!(validated.feature_type, FeatureType::Batch);
        assert_eq!(validated.feature_data_type, FeatureDataType::Integer);
    }

    #[test]
    fn test_create_errors_are_aggregated_per_field() {
        let bad = CreateFeature {
            feature_name: "bad name".to_string(),
            feature_type: "streaming".to_string(),
            feature_data_type: "varchar".to_string(),
            query: "  ".to_string(),
            description: String::new(),
            created_by: "alice".to_string(),
        };
        match validate_create(&bad) {
            Err(RegistryError::ValidationFailed { errors }) => {
                let fields: Vec<_> = errors.keys().map(String::as_str).collect();
                assert_eq!(
                    fields,
                    vec![
                        "description",
                        "feature_data_type",
                        "feature_name",
                        "feature_type",
                        "query"
                    ]
                );
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_destructive_queries_are_rejected_case_insensitively() {
        for query in ["DROP TABLE users", "delete from users", "  Drop view x"] {
            let mut p = payload();
            p.query = query.to_string();
            assert!(validate_create(&p).is_err(), "{query} should be rejected");
        }
        let mut p = payload();
        p.query = "SELECT dropped FROM t".to_string();
        assert!(validate_create(&p).is_ok());
    }

    #[test]
    fn test_update_only_checks_supplied_fields() {
        let update = UpdateFeature {
            feature_name: "user:age:v1".to_string(),
            last_updated_by: "bob".to_string(),
            description: Some("new text".to_string()),
            ..Default::default()
        };
        let validated = validate_update(&update).unwrap();
        assert!(validated.feature_type.is_none());

        let bad = UpdateFeature {
            query: Some("delete everything".to_string()),
            ..update
        };
        assert!(matches!(
            validate_update(&bad),
            Err(RegistryError::ValidationFailed { .. })
        ));
    }
}
