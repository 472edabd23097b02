//! In-memory directory implementation.
//!
//! Backs tests and local development with the same semantics the service
//! relies on from the real directory: organizations with member lists,
//! hierarchical groups with attributes, and per-user group memberships.
//! Fault injection hooks let tests exercise the degrade-to-empty read
//! path and partial write failures.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use domain::models::{DirectoryGroup, GroupRef, NewChildGroup, OrgMember};

use crate::client::DirectoryApi;
use crate::error::DirectoryError;

#[derive(Debug, Clone)]
struct StoredGroup {
    id: String,
    name: String,
    path: String,
    parent_id: Option<String>,
    attributes: HashMap<String, Vec<String>>,
}

impl StoredGroup {
    fn to_directory_group(&self) -> DirectoryGroup {
        DirectoryGroup {
            id: self.id.clone(),
            name: self.name.clone(),
            path: Some(self.path.clone()),
            attributes: self.attributes.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<String, OrgMember>,
    /// Organization id -> member user ids, in insertion order (paging
    /// relies on a stable order).
    org_members: HashMap<String, Vec<String>>,
    /// Groups in insertion order.
    groups: Vec<StoredGroup>,
    /// Group id -> member user ids, in insertion order.
    memberships: HashMap<String, Vec<String>>,
    /// Users whose group lookups fail.
    fail_user_groups: HashSet<String>,
    /// Users whose membership mutations fail.
    fail_membership_changes: HashSet<String>,
    next_group_id: u64,
}

/// Mutex-guarded in-memory directory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: Mutex<State>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a user record.
    pub fn insert_user(&self, user: OrgMember) {
        let mut state = self.state.lock().unwrap();
        state.users.insert(user.id.clone(), user);
    }

    /// Adds a user to an organization's member list.
    pub fn add_org_member(&self, organization_id: &str, user_id: &str) {
        let mut state = self.state.lock().unwrap();
        let members = state
            .org_members
            .entry(organization_id.to_string())
            .or_default();
        if !members.iter().any(|id| id == user_id) {
            members.push(user_id.to_string());
        }
    }

    /// Creates a top-level group and returns its id.
    pub fn create_group(&self, name: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let id = next_id(&mut state);
        state.groups.push(StoredGroup {
            id: id.clone(),
            name: name.to_string(),
            path: format!("/{}", name),
            parent_id: None,
            attributes: HashMap::new(),
        });
        id
    }

    /// Creates a child group directly (seeding shortcut) and returns its id.
    pub fn create_child(
        &self,
        parent_id: &str,
        name: &str,
        attributes: HashMap<String, Vec<String>>,
    ) -> String {
        let mut state = self.state.lock().unwrap();
        let parent_path = state
            .groups
            .iter()
            .find(|g| g.id == parent_id)
            .map(|g| g.path.clone())
            .unwrap_or_default();
        let id = next_id(&mut state);
        state.groups.push(StoredGroup {
            id: id.clone(),
            name: name.to_string(),
            path: format!("{}/{}", parent_path, name),
            parent_id: Some(parent_id.to_string()),
            attributes,
        });
        id
    }

    /// Adds a user to a group without going through the trait.
    pub fn join_group(&self, user_id: &str, group_id: &str) {
        let mut state = self.state.lock().unwrap();
        let members = state.memberships.entry(group_id.to_string()).or_default();
        if !members.iter().any(|id| id == user_id) {
            members.push(user_id.to_string());
        }
    }

    /// Makes `list_user_groups` fail for the given user.
    pub fn fail_user_groups(&self, user_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.fail_user_groups.insert(user_id.to_string());
    }

    /// Makes membership mutations fail for the given user.
    pub fn fail_membership_changes(&self, user_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.fail_membership_changes.insert(user_id.to_string());
    }

    /// Current member ids of a group (assertion helper).
    pub fn group_member_ids(&self, group_id: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.memberships.get(group_id).cloned().unwrap_or_default()
    }

    /// Finds a group by exact name (assertion helper).
    pub fn find_group_by_name(&self, name: &str) -> Option<DirectoryGroup> {
        let state = self.state.lock().unwrap();
        state
            .groups
            .iter()
            .find(|g| g.name == name)
            .map(StoredGroup::to_directory_group)
    }
}

fn next_id(state: &mut State) -> String {
    state.next_group_id += 1;
    format!("g-{}", state.next_group_id)
}

fn simulated_failure(operation: &str, user_id: &str) -> DirectoryError {
    DirectoryError::Upstream {
        status: 502,
        message: format!("simulated {} failure for {}", operation, user_id),
    }
}

#[async_trait]
impl DirectoryApi for InMemoryDirectory {
    async fn list_org_members(
        &self,
        organization_id: &str,
        first: usize,
        max: usize,
    ) -> Result<Vec<OrgMember>, DirectoryError> {
        let state = self.state.lock().unwrap();
        let ids = state
            .org_members
            .get(organization_id)
            .cloned()
            .unwrap_or_default();
        Ok(ids
            .iter()
            .skip(first)
            .take(max)
            .filter_map(|id| state.users.get(id).cloned())
            .collect())
    }

    async fn list_user_groups(&self, user_id: &str) -> Result<Vec<GroupRef>, DirectoryError> {
        let state = self.state.lock().unwrap();
        if state.fail_user_groups.contains(user_id) {
            return Err(simulated_failure("group lookup", user_id));
        }
        Ok(state
            .groups
            .iter()
            .filter(|group| {
                state
                    .memberships
                    .get(&group.id)
                    .is_some_and(|members| members.iter().any(|id| id == user_id))
            })
            .map(|group| GroupRef {
                id: group.id.clone(),
                name: group.name.clone(),
            })
            .collect())
    }

    async fn list_groups(&self) -> Result<Vec<DirectoryGroup>, DirectoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .groups
            .iter()
            .filter(|group| group.parent_id.is_none())
            .map(StoredGroup::to_directory_group)
            .collect())
    }

    async fn list_group_children(
        &self,
        group_id: &str,
    ) -> Result<Vec<DirectoryGroup>, DirectoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .groups
            .iter()
            .filter(|group| group.parent_id.as_deref() == Some(group_id))
            .map(StoredGroup::to_directory_group)
            .collect())
    }

    async fn list_group_members(&self, group_id: &str) -> Result<Vec<OrgMember>, DirectoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .memberships
            .get(group_id)
            .map(|members| {
                members
                    .iter()
                    .filter_map(|id| state.users.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create_child_group(
        &self,
        parent_id: &str,
        group: &NewChildGroup,
    ) -> Result<(), DirectoryError> {
        let mut state = self.state.lock().unwrap();
        let parent_path = state
            .groups
            .iter()
            .find(|g| g.id == parent_id)
            .map(|g| g.path.clone())
            .ok_or_else(|| DirectoryError::Upstream {
                status: 404,
                message: format!("parent group {} not found", parent_id),
            })?;
        if state
            .groups
            .iter()
            .any(|g| g.parent_id.as_deref() == Some(parent_id) && g.name == group.name)
        {
            return Err(DirectoryError::Upstream {
                status: 409,
                message: format!("sibling group named {} already exists", group.name),
            });
        }
        let id = next_id(&mut state);
        state.groups.push(StoredGroup {
            id,
            name: group.name.clone(),
            path: format!("{}/{}", parent_path, group.name),
            parent_id: Some(parent_id.to_string()),
            attributes: group.attributes.clone(),
        });
        Ok(())
    }

    async fn add_user_to_group(
        &self,
        user_id: &str,
        group_id: &str,
    ) -> Result<(), DirectoryError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_membership_changes.contains(user_id) {
            return Err(simulated_failure("membership change", user_id));
        }
        let members = state.memberships.entry(group_id.to_string()).or_default();
        if !members.iter().any(|id| id == user_id) {
            members.push(user_id.to_string());
        }
        Ok(())
    }

    async fn remove_user_from_group(
        &self,
        user_id: &str,
        group_id: &str,
    ) -> Result<(), DirectoryError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_membership_changes.contains(user_id) {
            return Err(simulated_failure("membership change", user_id));
        }
        if let Some(members) = state.memberships.get_mut(group_id) {
            members.retain(|id| id != user_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> OrgMember {
        OrgMember {
            id: id.to_string(),
            username: Some(id.to_string()),
            first_name: None,
            last_name: None,
            email: None,
            enabled: Some(true),
        }
    }

    #[tokio::test]
    async fn org_member_listing_is_paged() {
        let directory = InMemoryDirectory::new();
        for i in 0..5 {
            let id = format!("u-{}", i);
            directory.insert_user(user(&id));
            directory.add_org_member("org-1", &id);
        }

        let first_page = directory.list_org_members("org-1", 0, 2).await.unwrap();
        let second_page = directory.list_org_members("org-1", 2, 2).await.unwrap();
        let last_page = directory.list_org_members("org-1", 4, 2).await.unwrap();

        assert_eq!(first_page.len(), 2);
        assert_eq!(second_page.len(), 2);
        assert_eq!(last_page.len(), 1);
        assert_eq!(first_page[0].id, "u-0");
        assert_eq!(last_page[0].id, "u-4");
    }

    #[tokio::test]
    async fn user_group_lookup_reflects_memberships() {
        let directory = InMemoryDirectory::new();
        directory.insert_user(user("u-1"));
        let group_id = directory.create_group("Salesman");
        directory.join_group("u-1", &group_id);

        let groups = directory.list_user_groups("u-1").await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "Salesman");

        directory.fail_user_groups("u-1");
        assert!(directory.list_user_groups("u-1").await.is_err());
    }

    #[tokio::test]
    async fn child_group_creation_and_listing() {
        let directory = InMemoryDirectory::new();
        let root = directory.create_group("Sales Manager");

        let new_group = NewChildGroup {
            name: "SM - Jane Doe".to_string(),
            attributes: HashMap::from([(
                "managerUserId".to_string(),
                vec!["mgr-1".to_string()],
            )]),
        };
        directory.create_child_group(&root, &new_group).await.unwrap();

        let children = directory.list_group_children(&root).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "SM - Jane Doe");
        assert_eq!(children[0].first_attribute("managerUserId"), Some("mgr-1"));
        assert_eq!(
            children[0].path.as_deref(),
            Some("/Sales Manager/SM - Jane Doe")
        );

        // Top-level listing excludes children.
        let top_level = directory.list_groups().await.unwrap();
        assert_eq!(top_level.len(), 1);
        assert_eq!(top_level[0].name, "Sales Manager");

        // Sibling name collision is rejected like the real directory does.
        assert!(directory.create_child_group(&root, &new_group).await.is_err());
    }

    #[tokio::test]
    async fn membership_mutations_are_idempotent() {
        let directory = InMemoryDirectory::new();
        directory.insert_user(user("u-1"));
        let group_id = directory.create_group("Salesman");

        directory.add_user_to_group("u-1", &group_id).await.unwrap();
        directory.add_user_to_group("u-1", &group_id).await.unwrap();
        assert_eq!(directory.group_member_ids(&group_id), vec!["u-1"]);

        directory
            .remove_user_from_group("u-1", &group_id)
            .await
            .unwrap();
        directory
            .remove_user_from_group("u-1", &group_id)
            .await
            .unwrap();
        assert!(directory.group_member_ids(&group_id).is_empty());
    }

    #[tokio::test]
    async fn injected_membership_fault_fails_mutations() {
        let directory = InMemoryDirectory::new();
        directory.insert_user(user("u-1"));
        let group_id = directory.create_group("Salesman");
        directory.fail_membership_changes("u-1");

        let err = directory
            .add_user_to_group("u-1", &group_id)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(502));
    }
}
