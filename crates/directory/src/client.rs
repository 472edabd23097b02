//! The directory service port.

use async_trait::async_trait;

use domain::models::{DirectoryGroup, GroupRef, NewChildGroup, OrgMember};

use crate::error::DirectoryError;

/// Calls this service makes against the external identity directory.
///
/// The directory is process-external mutable shared state with no local
/// cache: every read goes to the wire (or to the in-memory fake in tests).
/// None of the mutation calls are transactional across users; callers own
/// partial-failure handling.
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// Lists members of an organization, paged with `first`/`max`.
    async fn list_org_members(
        &self,
        organization_id: &str,
        first: usize,
        max: usize,
    ) -> Result<Vec<OrgMember>, DirectoryError>;

    /// Lists the directory groups a user belongs to.
    async fn list_user_groups(&self, user_id: &str) -> Result<Vec<GroupRef>, DirectoryError>;

    /// Lists all top-level directory groups with attributes.
    async fn list_groups(&self) -> Result<Vec<DirectoryGroup>, DirectoryError>;

    /// Lists the direct children of a group.
    async fn list_group_children(
        &self,
        group_id: &str,
    ) -> Result<Vec<DirectoryGroup>, DirectoryError>;

    /// Lists the members of a group.
    async fn list_group_members(&self, group_id: &str) -> Result<Vec<OrgMember>, DirectoryError>;

    /// Creates a child group under a parent group.
    ///
    /// The directory does not return the created group; callers re-fetch
    /// the children to locate it.
    async fn create_child_group(
        &self,
        parent_id: &str,
        group: &NewChildGroup,
    ) -> Result<(), DirectoryError>;

    /// Adds a user to a group (idempotent on the directory side).
    async fn add_user_to_group(&self, user_id: &str, group_id: &str)
        -> Result<(), DirectoryError>;

    /// Removes a user from a group.
    async fn remove_user_from_group(
        &self,
        user_id: &str,
        group_id: &str,
    ) -> Result<(), DirectoryError>;
}
