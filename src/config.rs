use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::registry::similarity::DEFAULT_FUZZY_THRESHOLD;
use crate::registry::StoreOptions;

/// Main configuration structure for the feature registry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistryConfig {
    /// Where and how the feature table is stored
    pub storage: StorageConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
    /// Workflow tuning
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Path of the JSON metadata file
    pub metadata_path: PathBuf,
    /// Start with an empty table when the stored one cannot be read
    pub fail_open_on_load: bool,
    /// Pretty-print the stored JSON
    pub pretty_json: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level directive, e.g. "info" or "feature_registry=debug"
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowConfig {
    /// Minimum average similarity for the fuzzy listing fallback
    pub fuzzy_threshold: f64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                metadata_path: PathBuf::from(".feature-registry/metadata.json"),
                fail_open_on_load: true,
                pretty_json: true,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: true,
            },
            workflow: WorkflowConfig {
                fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            },
        }
    }
}

impl RegistryConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (feature-registry.toml, or `path` when given)
    /// 3. Environment variables (prefixed with FEATURE_REGISTRY__)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&RegistryConfig::default())?;
        let mut builder = Config::builder().add_source(defaults);

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path));
            }
            None => {
                if Path::new("feature-registry.toml").exists() {
                    builder = builder.add_source(File::with_name("feature-registry"));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("FEATURE_REGISTRY")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: RegistryConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.workflow.fuzzy_threshold) {
            anyhow::bail!(
                "workflow.fuzzy_threshold must be between 0.0 and 1.0, got {}",
                self.workflow.fuzzy_threshold
            );
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            fail_open_on_load: self.storage.fail_open_on_load,
            pretty_json: self.storage.pretty_json,
            fuzzy_threshold: self.workflow.fuzzy_threshold,
        }
    }
}
