// Feature Registry Library - role-gated workflow for feature metadata
// This exposes the core components for testing and integration

pub mod cli;
pub mod config;
pub mod persistence;
pub mod registry;
pub mod telemetry;

// Re-export key types for easy access
pub use config::RegistryConfig;
pub use persistence::{ByteStore, FileByteStore, MemoryByteStore, PersistenceError};
pub use registry::{
    allowed_transitions, can_perform, Action, FeatureRecord, FeatureStatus, FeatureStore,
    RegistryError, Role, StoreOptions,
};
pub use telemetry::{create_operation_span, generate_correlation_id, init_telemetry};
