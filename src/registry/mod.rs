// Feature registry core: authorization table, validation and workflow engine

pub mod authorization;
pub mod errors;
pub mod similarity;
pub mod store;
pub mod types;
pub mod validation;

pub use authorization::{allowed_transitions, can_perform, Action, Role};
pub use errors::RegistryError;
pub use store::{FeatureStore, StoreOptions};
pub use types::{
    ApproveFeature, CreateFeature, DeleteFeature, DeployFeature, FeatureDataType,
    FeatureFilters, FeatureRecord, FeatureStatus, FeatureType, FixFeature, RecordTest,
    RejectFeature, SubmitForTesting, TestResult, UpdateFeature,
};
