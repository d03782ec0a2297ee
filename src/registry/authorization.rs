//! Static role/action permission matrix and per-role transition table.
//!
//! Pure lookups. Unknown roles, actions or statuses yield the negative
//! answer; callers turn that into an authorization error.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::types::FeatureStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Developer,
    Tester,
    Approver,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Developer => "developer",
            Role::Tester => "tester",
            Role::Approver => "approver",
        }
    }

    pub fn can(&self, action: Action) -> bool {
        use Action::*;
        match self {
            Role::Developer => matches!(action, Create | Update | Delete | SubmitTest | Fix),
            Role::Tester => matches!(action, Test),
            Role::Approver => matches!(action, Approve | Reject | Deploy),
        }
    }

    pub fn transitions_from(&self, from: FeatureStatus) -> BTreeSet<FeatureStatus> {
        use FeatureStatus::*;
        let targets: &[FeatureStatus] = match (self, from) {
            (Role::Developer, Draft) => &[Draft, ReadyForTesting, Deleted],
            (Role::Developer, ReadyForTesting)
            | (Role::Developer, TestSucceeded)
            | (Role::Developer, TestFailed)
            | (Role::Developer, Approved)
            | (Role::Developer, Rejected) => &[Draft, Deleted],
            (Role::Tester, ReadyForTesting) => &[TestSucceeded, TestFailed],
            (Role::Approver, TestSucceeded) => &[Approved, Rejected],
            (Role::Approver, Approved) => &[Deployed],
            _ => &[],
        };
        targets.iter().copied().collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "developer" => Ok(Role::Developer),
            "tester" | "external_testing_system" => Ok(Role::Tester),
            "approver" => Ok(Role::Approver),
            other => Err(format!("Invalid role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Delete,
    SubmitTest,
    Fix,
    Test,
    Approve,
    Reject,
    Deploy,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::SubmitTest => "submit_test",
            Action::Fix => "fix",
            Action::Test => "test",
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::Deploy => "deploy",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Action::Create),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            "submit_test" | "ready_for_testing" => Ok(Action::SubmitTest),
            "fix" => Ok(Action::Fix),
            "test" => Ok(Action::Test),
            "approve" => Ok(Action::Approve),
            "reject" => Ok(Action::Reject),
            "deploy" => Ok(Action::Deploy),
            other => Err(format!("unknown action '{other}'")),
        }
    }
}

/// May `role` perform `action` at all?
pub fn can_perform(role: &str, action: &str) -> bool {
    match (role.parse::<Role>(), action.parse::<Action>()) {
        (Ok(role), Ok(action)) => role.can(action),
        _ => false,
    }
}

/// Statuses `role` may move a record into from `from_status`.
pub fn allowed_transitions(role: &str, from_status: &str) -> BTreeSet<FeatureStatus> {
    match (role.parse::<Role>(), from_status.parse::<FeatureStatus>()) {
        (Ok(role), Ok(from)) => role.transitions_from(from),
        _ => BTreeSet::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTIONS: [&str; 9] = [
        "create",
        "update",
        "delete",
        "submit_test",
        "fix",
        "test",
        "approve",
        "reject",
        "deploy",
    ];

    fn granted(role: &str) -> Vec<&'static str> {
        ACTIONS
            .iter()
            .copied()
            .filter(|action| can_perform(role, action))
            .collect()
    }

    #[test]
    fn test_permission_matrix() {
        assert_eq!(
            granted("developer"),
            vec!["create", "update", "delete", "submit_test", "fix"]
        );
        assert_eq!(granted("tester"), vec!["test"]);
        assert_eq!(granted("approver"), vec!["approve", "reject", "deploy"]);
    }

    #[test]
    fn test_external_testing_system_is_a_tester() {
        assert_eq!(granted("external_testing_system"), granted("tester"));
        assert_eq!(
            "external_testing_system".parse::<Role>().unwrap(),
            Role::Tester
        );
    }

    #[test]
    fn test_ready_for_testing_alias() {
        assert!(can_perform("developer", "ready_for_testing"));
        assert!(!can_perform("approver", "ready_for_testing"));
    }

    #[test]
    fn test_unknown_role_or_action_is_denied() {
        assert!(!can_perform("admin", "create"));
        assert!(!can_perform("developer", "launch"));
        assert!(!can_perform("Developer", "create"));
    }

    #[test]
    fn test_allowed_transitions() {
        use FeatureStatus::*;
        assert_eq!(
            allowed_transitions("tester", "READY_FOR_TESTING"),
            [TestSucceeded, TestFailed].into_iter().collect()
        );
        assert_eq!(
            allowed_transitions("approver", "TEST_SUCCEEDED"),
            [Approved, Rejected].into_iter().collect()
        );
        assert!(allowed_transitions("developer", "REJECTED").contains(&Draft));
        assert!(allowed_transitions("tester", "DRAFT").is_empty());
    }

    #[test]
    fn test_terminal_states_have_no_transitions() {
        for role in ["developer", "tester", "approver"] {
            assert!(allowed_transitions(role, "DEPLOYED").is_empty());
            assert!(allowed_transitions(role, "DELETED").is_empty());
        }
    }

    #[test]
    fn test_unknown_inputs_yield_empty_set() {
        assert!(allowed_transitions("nobody", "DRAFT").is_empty());
        assert!(allowed_transitions("developer", "LIMBO").is_empty());
    }
}
