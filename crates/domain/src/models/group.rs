//! Directory group domain models.
//!
//! Groups live in the external identity directory. The directory is the
//! system of record for assignments: a salesman is assigned to a manager
//! exactly when the salesman is a member of the manager's child group
//! under the root "Sales Manager" group.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::member::UserSummary;

/// Group attribute holding the user id of the manager owning a child group.
pub const ATTR_MANAGER_USER_ID: &str = "managerUserId";
/// Group attribute holding the owning manager's username.
pub const ATTR_MANAGER_USERNAME: &str = "managerUsername";
/// Group attribute holding the owning manager's email.
pub const ATTR_MANAGER_EMAIL: &str = "managerEmail";
/// Group attribute holding the owning manager's display name.
pub const ATTR_MANAGER_DISPLAY_NAME: &str = "managerDisplayName";

/// Prefix for lazily created manager child groups.
pub const CHILD_GROUP_PREFIX: &str = "SM - ";

/// Maximum length of a generated child group name.
const CHILD_GROUP_NAME_MAX: usize = 70;

/// Length of the manager-id suffix appended on name collision.
const CHILD_GROUP_SUFFIX_LEN: usize = 8;

/// Lightweight reference to a directory group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    pub id: String,
    pub name: String,
}

/// A directory group with its attributes, as returned by the directory
/// admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryGroup {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, Vec<String>>,
}

impl DirectoryGroup {
    /// Gets the first value of an attribute, if present.
    pub fn first_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

}

/// Specification for a child group to create under the root group.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChildGroup {
    pub name: String,
    pub attributes: HashMap<String, Vec<String>>,
}

impl NewChildGroup {
    /// Builds the child group for a manager.
    ///
    /// The name is `"SM - " + fullName`, truncated to 70 characters. If the
    /// name collides with an existing child group name, the first 8
    /// characters of the manager's user id are appended to disambiguate.
    /// The group is tagged with the manager's identity attributes so that
    /// ownership survives membership changes.
    pub fn for_manager(manager: &UserSummary, existing_names: &[String]) -> Self {
        let mut name: String = format!("{}{}", CHILD_GROUP_PREFIX, manager.full_name)
            .chars()
            .take(CHILD_GROUP_NAME_MAX)
            .collect();

        if existing_names.iter().any(|existing| existing == &name) {
            let suffix: String = manager.id.chars().take(CHILD_GROUP_SUFFIX_LEN).collect();
            name = format!("{} ({})", name, suffix);
        }

        let mut attributes = HashMap::new();
        attributes.insert(ATTR_MANAGER_USER_ID.to_string(), vec![manager.id.clone()]);
        if let Some(username) = &manager.username {
            attributes.insert(ATTR_MANAGER_USERNAME.to_string(), vec![username.clone()]);
        }
        if let Some(email) = &manager.email {
            attributes.insert(ATTR_MANAGER_EMAIL.to_string(), vec![email.clone()]);
        }
        attributes.insert(
            ATTR_MANAGER_DISPLAY_NAME.to_string(),
            vec![manager.full_name.clone()],
        );

        Self { name, attributes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::member::OrgMember;

    fn manager(id: &str, first: &str, last: &str) -> UserSummary {
        UserSummary::from_member(&OrgMember {
            id: id.to_string(),
            username: Some(format!("{}.{}", first, last).to_lowercase()),
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            email: Some(format!("{}@example.com", first).to_lowercase()),
            enabled: Some(true),
        })
    }

    #[test]
    fn child_group_name_uses_full_name() {
        let group = NewChildGroup::for_manager(&manager("mgr-1", "Jane", "Doe"), &[]);
        assert_eq!(group.name, "SM - Jane Doe");
    }

    #[test]
    fn child_group_name_truncated_to_70_chars() {
        let long = "A".repeat(100);
        let summary = manager("mgr-1", &long, "X");
        let group = NewChildGroup::for_manager(&summary, &[]);
        assert_eq!(group.name.chars().count(), 70);
    }

    #[test]
    fn child_group_name_disambiguated_on_collision() {
        let existing = vec!["SM - Jane Doe".to_string()];
        let group = NewChildGroup::for_manager(&manager("mgr-12345678-rest", "Jane", "Doe"), &existing);
        assert_eq!(group.name, "SM - Jane Doe (mgr-1234)");
    }

    #[test]
    fn child_group_tagged_with_manager_attributes() {
        let group = NewChildGroup::for_manager(&manager("mgr-1", "Jane", "Doe"), &[]);
        assert_eq!(
            group.attributes.get(ATTR_MANAGER_USER_ID),
            Some(&vec!["mgr-1".to_string()])
        );
        assert_eq!(
            group.attributes.get(ATTR_MANAGER_DISPLAY_NAME),
            Some(&vec!["Jane Doe".to_string()])
        );
        assert_eq!(
            group.attributes.get(ATTR_MANAGER_USERNAME),
            Some(&vec!["jane.doe".to_string()])
        );
        assert_eq!(
            group.attributes.get(ATTR_MANAGER_EMAIL),
            Some(&vec!["jane@example.com".to_string()])
        );
    }

    #[test]
    fn first_attribute_returns_first_value() {
        let mut attributes = HashMap::new();
        attributes.insert(
            ATTR_MANAGER_USER_ID.to_string(),
            vec!["mgr-1".to_string(), "mgr-2".to_string()],
        );
        let group = DirectoryGroup {
            id: "g-1".to_string(),
            name: "SM - Jane Doe".to_string(),
            path: Some("/Sales Manager/SM - Jane Doe".to_string()),
            attributes,
        };
        assert_eq!(group.first_attribute(ATTR_MANAGER_USER_ID), Some("mgr-1"));
        assert_eq!(group.first_attribute("missing"), None);
    }

    #[test]
    fn directory_group_deserializes_without_attributes() {
        let json = r#"{"id": "g-1", "name": "Salesman"}"#;
        let group: DirectoryGroup = serde_json::from_str(json).unwrap();
        assert_eq!(group.name, "Salesman");
        assert!(group.attributes.is_empty());
        assert!(group.path.is_none());
    }
}
