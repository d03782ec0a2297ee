use std::collections::BTreeMap;
use thiserror::Error;

use crate::persistence::PersistenceError;

/// Failures returned by every registry operation.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Feature {feature_name} not found")]
    NotFound { feature_name: String },

    #[error("Feature {feature_name} already exists")]
    AlreadyExists { feature_name: String },

    #[error("Validation failed: {}", format_field_errors(.errors))]
    ValidationFailed { errors: BTreeMap<String, String> },

    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("Invalid state transition: {reason}")]
    InvalidStateTransition { reason: String },

    #[error("Persistence failure: {0}")]
    Persistence(#[from] PersistenceError),
}

impl RegistryError {
    pub fn validation(field: &str, reason: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.to_string(), reason.into());
        RegistryError::ValidationFailed { errors }
    }

    pub fn not_found(feature_name: &str) -> Self {
        RegistryError::NotFound {
            feature_name: feature_name.to_string(),
        }
    }

    /// Stable kind name, used in logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryError::NotFound { .. } => "not_found",
            RegistryError::AlreadyExists { .. } => "already_exists",
            RegistryError::ValidationFailed { .. } => "validation_failed",
            RegistryError::Unauthorized { .. } => "unauthorized",
            RegistryError::InvalidStateTransition { .. } => "invalid_state_transition",
            RegistryError::Persistence(_) => "persistence_failure",
        }
    }

    /// Transport status a request layer should answer with. Role errors
    /// are reported as bad requests, not 403.
    pub fn status_code(&self) -> u16 {
        match self {
            RegistryError::NotFound { .. } => 404,
            RegistryError::AlreadyExists { .. }
            | RegistryError::ValidationFailed { .. }
            | RegistryError::Unauthorized { .. }
            | RegistryError::InvalidStateTransition { .. } => 400,
            RegistryError::Persistence(_) => 500,
        }
    }
}

fn format_field_errors(errors: &BTreeMap<String, String>) -> String {
    errors
        .iter()
        .map(|(field, reason)| format!("{field}: {reason}"))
        .collect::<Vec<_>>()
        .join("; ")
}
