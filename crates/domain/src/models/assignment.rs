//! Assignment view and mutation DTOs.
//!
//! An assignment is not stored anywhere in this service: it is the fact
//! that a salesman is a member of a manager's child group in the external
//! directory. These types shape that external state for the HTTP API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::member::UserSummary;

/// Requested mutation kind for an assignment batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentAction {
    Assign,
    Unassign,
}

impl FromStr for AssignmentAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assign" => Ok(AssignmentAction::Assign),
            "unassign" => Ok(AssignmentAction::Unassign),
            other => Err(format!(
                "action must be \"assign\" or \"unassign\", got \"{}\"",
                other
            )),
        }
    }
}

impl fmt::Display for AssignmentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentAction::Assign => write!(f, "assign"),
            AssignmentAction::Unassign => write!(f, "unassign"),
        }
    }
}

/// Body of a POST assignment request.
///
/// `action` is kept as a raw string so an unknown literal produces a 400
/// with a specific message instead of a generic deserialization error.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRequest {
    #[validate(length(min = 1, message = "action is required"))]
    pub action: String,
    #[validate(length(min = 1, message = "managerUserId is required"))]
    pub manager_user_id: String,
    #[validate(length(min = 1, message = "at least one salesmanUserId is required"))]
    pub salesman_user_ids: Vec<String>,
}

/// A per-user mutation failure, reported alongside any successes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedAssignment {
    pub user_id: String,
    pub error: String,
}

/// A salesman already owned by a different manager's child group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentConflict {
    pub salesman_user_id: String,
    pub assigned_group_id: String,
}

/// Identifying view of a directory group for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// One row per sales manager in the assignment board.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerRow {
    #[serde(flatten)]
    pub manager: UserSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_group_name: Option<String>,
    pub assigned_salesmen: Vec<UserSummary>,
}

/// Full assignment view for an organization (GET response).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentBoard {
    pub sales_manager_group: GroupSummary,
    pub sales_managers: Vec<ManagerRow>,
    pub available_salesmen: Vec<UserSummary>,
}

/// Result envelope for a POST assignment batch.
///
/// Mutations are applied per user and are not transactional; partial
/// success is reported here, never rolled back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentOutcome {
    pub success: bool,
    pub message: String,
    pub action: AssignmentAction,
    pub manager_group: Option<GroupSummary>,
    pub assigned_user_ids: Vec<String>,
    pub unassigned_user_ids: Vec<String>,
    pub failed_assignments: Vec<FailedAssignment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_parses_known_literals() {
        assert_eq!("assign".parse::<AssignmentAction>(), Ok(AssignmentAction::Assign));
        assert_eq!(
            "unassign".parse::<AssignmentAction>(),
            Ok(AssignmentAction::Unassign)
        );
    }

    #[test]
    fn action_rejects_unknown_literal() {
        let err = "reassign".parse::<AssignmentAction>().unwrap_err();
        assert!(err.contains("reassign"));
    }

    #[test]
    fn action_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&AssignmentAction::Assign).unwrap(),
            "\"assign\""
        );
        assert_eq!(
            serde_json::to_string(&AssignmentAction::Unassign).unwrap(),
            "\"unassign\""
        );
    }

    #[test]
    fn request_deserializes_camel_case() {
        let json = r#"{
            "action": "assign",
            "managerUserId": "mgr-1",
            "salesmanUserIds": ["s-1", "s-2"]
        }"#;
        let request: AssignmentRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.action, "assign");
        assert_eq!(request.manager_user_id, "mgr-1");
        assert_eq!(request.salesman_user_ids, vec!["s-1", "s-2"]);
    }

    #[test]
    fn request_validation_rejects_empty_fields() {
        let request = AssignmentRequest {
            action: "assign".to_string(),
            manager_user_id: String::new(),
            salesman_user_ids: vec![],
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("manager_user_id"));
        assert!(errors.field_errors().contains_key("salesman_user_ids"));
    }

    #[test]
    fn manager_row_flattens_summary_fields() {
        let row = ManagerRow {
            manager: UserSummary {
                id: "mgr-1".to_string(),
                username: Some("jdoe".to_string()),
                first_name: Some("Jane".to_string()),
                last_name: Some("Doe".to_string()),
                email: None,
                enabled: Some(true),
                full_name: "Jane Doe".to_string(),
            },
            assigned_group_id: Some("g-1".to_string()),
            assigned_group_name: Some("SM - Jane Doe".to_string()),
            assigned_salesmen: vec![],
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["id"], "mgr-1");
        assert_eq!(json["fullName"], "Jane Doe");
        assert_eq!(json["assignedGroupId"], "g-1");
        assert_eq!(json["assignedSalesmen"], serde_json::json!([]));
    }
}
