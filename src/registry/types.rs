use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workflow status of a feature record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureStatus {
    Draft,
    ReadyForTesting,
    TestSucceeded,
    TestFailed,
    Approved,
    Rejected,
    Deployed,
    Deleted,
}

impl FeatureStatus {
    pub const ALL: [FeatureStatus; 8] = [
        FeatureStatus::Draft,
        FeatureStatus::ReadyForTesting,
        FeatureStatus::TestSucceeded,
        FeatureStatus::TestFailed,
        FeatureStatus::Approved,
        FeatureStatus::Rejected,
        FeatureStatus::Deployed,
        FeatureStatus::Deleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureStatus::Draft => "DRAFT",
            FeatureStatus::ReadyForTesting => "READY_FOR_TESTING",
            FeatureStatus::TestSucceeded => "TEST_SUCCEEDED",
            FeatureStatus::TestFailed => "TEST_FAILED",
            FeatureStatus::Approved => "APPROVED",
            FeatureStatus::Rejected => "REJECTED",
            FeatureStatus::Deployed => "DEPLOYED",
            FeatureStatus::Deleted => "DELETED",
        }
    }

    /// Terminal states have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FeatureStatus::Deployed | FeatureStatus::Deleted)
    }
}

impl fmt::Display for FeatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown status '{s}'"))
    }
}

/// Outcome reported by a tester. Only the two test statuses are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestResult {
    TestSucceeded,
    TestFailed,
}

impl TestResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestResult::TestSucceeded => "TEST_SUCCEEDED",
            TestResult::TestFailed => "TEST_FAILED",
        }
    }

    pub fn status(&self) -> FeatureStatus {
        match self {
            TestResult::TestSucceeded => FeatureStatus::TestSucceeded,
            TestResult::TestFailed => FeatureStatus::TestFailed,
        }
    }
}

impl FromStr for TestResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TEST_SUCCEEDED" => Ok(TestResult::TestSucceeded),
            "TEST_FAILED" => Ok(TestResult::TestFailed),
            other => Err(format!(
                "invalid test result '{other}', expected TEST_SUCCEEDED or TEST_FAILED"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureType {
    #[serde(rename = "batch")]
    Batch,
    #[serde(rename = "real-time")]
    RealTime,
    #[serde(rename = "compute-first")]
    ComputeFirst,
}

impl FeatureType {
    pub const ALL: [FeatureType; 3] = [
        FeatureType::Batch,
        FeatureType::RealTime,
        FeatureType::ComputeFirst,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureType::Batch => "batch",
            FeatureType::RealTime => "real-time",
            FeatureType::ComputeFirst => "compute-first",
        }
    }
}

impl FromStr for FeatureType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                format!("must be one of: batch, real-time, compute-first (got '{s}')")
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureDataType {
    String,
    Float,
    Integer,
    Boolean,
    Double,
    Bigint,
    Int,
    Decimal,
}

impl FeatureDataType {
    pub const ALL: [FeatureDataType; 8] = [
        FeatureDataType::String,
        FeatureDataType::Float,
        FeatureDataType::Integer,
        FeatureDataType::Boolean,
        FeatureDataType::Double,
        FeatureDataType::Bigint,
        FeatureDataType::Int,
        FeatureDataType::Decimal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureDataType::String => "string",
            FeatureDataType::Float => "float",
            FeatureDataType::Integer => "integer",
            FeatureDataType::Boolean => "boolean",
            FeatureDataType::Double => "double",
            FeatureDataType::Bigint => "bigint",
            FeatureDataType::Int => "int",
            FeatureDataType::Decimal => "decimal",
        }
    }
}

impl FromStr for FeatureDataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureDataType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "must be one of: string, float, integer, boolean, double, bigint, int, decimal (got '{s}')"
                )
            })
    }
}

/// One tracked feature definition. The `feature_name` is the identity key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub feature_name: String,
    pub feature_type: FeatureType,
    pub feature_data_type: FeatureDataType,
    pub query: String,
    pub description: String,
    pub status: FeatureStatus,
    pub created_time: i64,
    pub updated_time: i64,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tested_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tested_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_result: Option<TestResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_reason: Option<String>,
}

impl FeatureRecord {
    /// String view of a filterable field, used by exact and fuzzy filtering.
    /// `query` is not filterable.
    pub fn filter_value(&self, field: &str) -> Option<String> {
        match field {
            "feature_name" => Some(self.feature_name.clone()),
            "feature_type" => Some(self.feature_type.as_str().to_string()),
            "feature_data_type" => Some(self.feature_data_type.as_str().to_string()),
            "description" => Some(self.description.clone()),
            "status" => Some(self.status.as_str().to_string()),
            "created_by" => Some(self.created_by.clone()),
            "last_updated_by" => self.last_updated_by.clone(),
            "submitted_by" => self.submitted_by.clone(),
            "tested_by" => self.tested_by.clone(),
            "approved_by" => self.approved_by.clone(),
            "rejected_by" => self.rejected_by.clone(),
            "deployed_by" => self.deployed_by.clone(),
            "deleted_by" => self.deleted_by.clone(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateFeature {
    pub feature_name: String,
    pub feature_type: String,
    pub feature_data_type: String,
    pub query: String,
    pub description: String,
    pub created_by: String,
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFeature {
    pub feature_name: String,
    pub last_updated_by: String,
    #[serde(default)]
    pub feature_type: Option<String>,
    #[serde(default)]
    pub feature_data_type: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteFeature {
    pub feature_name: String,
    pub deleted_by: String,
    pub deletion_reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitForTesting {
    pub feature_name: String,
    pub submitted_by: String,
}

/// `test_result` stays a raw string so an out-of-range value reaches the
/// engine and is reported as a validation failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordTest {
    pub feature_name: String,
    pub test_result: String,
    pub tested_by: String,
    #[serde(default)]
    pub test_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApproveFeature {
    pub feature_name: String,
    pub approved_by: String,
    #[serde(default)]
    pub approval_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RejectFeature {
    pub feature_name: String,
    pub rejected_by: String,
    pub rejection_reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixFeature {
    pub feature_name: String,
    pub last_updated_by: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployFeature {
    pub feature_name: String,
    pub deployed_by: String,
}

/// Filters for listing. Unset fields do not participate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureFilters {
    #[serde(default)]
    pub feature_name: Option<String>,
    #[serde(default)]
    pub feature_type: Option<String>,
    #[serde(default)]
    pub feature_data_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub last_updated_by: Option<String>,
}

impl FeatureFilters {
    pub fn active(&self) -> Vec<(&'static str, &str)> {
        [
            ("feature_name", &self.feature_name),
            ("feature_type", &self.feature_type),
            ("feature_data_type", &self.feature_data_type),
            ("description", &self.description),
            ("status", &self.status),
            ("created_by", &self.created_by),
            ("last_updated_by", &self.last_updated_by),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.as_deref().map(|v| (field, v)))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.active().is_empty()
    }
}
