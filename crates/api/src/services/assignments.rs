//! Sales-manager assignment flows.
//!
//! The read flow builds the assignment board for an organization; the
//! write flow applies an assign/unassign batch. Both operate purely
//! against the external directory: the membership of a manager's child
//! group under the root "Sales Manager" group *is* the assignment state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use directory::DirectoryApi;
use domain::models::group::ATTR_MANAGER_USER_ID;
use domain::models::{
    AssignmentAction, AssignmentBoard, AssignmentConflict, AssignmentOutcome, AssignmentRequest,
    DirectoryGroup, FailedAssignment, GroupSummary, ManagerRow, MemberWithGroups, NewChildGroup,
    OrgMember, UserSummary,
};
use domain::services::roles::{self, partition_roles};

use crate::error::ApiError;
use crate::middleware::metrics::record_assignment_mutations;

/// Error message for the distinguished missing-root-group 404.
pub const ROOT_GROUP_MISSING: &str = "Sales Manager group was not found in Keycloak";

/// A child group of the root group, together with its current members.
type ChildGroup = (DirectoryGroup, Vec<OrgMember>);

/// Orchestrates assignment reads and writes against the directory.
pub struct AssignmentService {
    directory: Arc<dyn DirectoryApi>,
    member_page_size: usize,
}

impl AssignmentService {
    pub fn new(directory: Arc<dyn DirectoryApi>, member_page_size: usize) -> Self {
        Self {
            directory,
            member_page_size,
        }
    }

    /// Builds the assignment board for an organization.
    pub async fn assignment_board(
        &self,
        organization_id: &str,
    ) -> Result<AssignmentBoard, ApiError> {
        let roster = self.load_roster(organization_id).await?;
        let partition = partition_roles(&roster);
        let root = self.resolve_root_group().await?;
        let children = self.child_groups_with_members(&root.id).await?;

        let manager_ids: HashSet<String> = partition
            .managers
            .iter()
            .map(|m| m.member.id.clone())
            .collect();
        let salesmen_by_id: HashMap<&str, &MemberWithGroups> = partition
            .salesmen
            .iter()
            .map(|m| (m.member.id.as_str(), m))
            .collect();

        // Index of every salesman currently sitting in some child group.
        let mut assigned_anywhere: HashSet<String> = HashSet::new();
        for (_, members) in &children {
            for member in members {
                assigned_anywhere.insert(member.id.clone());
            }
        }

        // One child group per owning manager; first match wins.
        let mut group_by_owner: HashMap<String, &ChildGroup> = HashMap::new();
        for entry in &children {
            if let Some(owner) = resolve_owner(&entry.0, &entry.1, &manager_ids) {
                group_by_owner.entry(owner).or_insert(entry);
            }
        }

        let mut available_salesmen: Vec<UserSummary> = partition
            .salesmen
            .iter()
            .filter(|m| !assigned_anywhere.contains(&m.member.id))
            .map(|m| UserSummary::from_member(&m.member))
            .collect();
        dedup_by_id(&mut available_salesmen);
        sort_by_full_name(&mut available_salesmen);

        let mut rows: Vec<ManagerRow> = Vec::with_capacity(partition.managers.len());
        for manager in &partition.managers {
            let summary = UserSummary::from_member(&manager.member);
            let owned = group_by_owner.get(summary.id.as_str());

            let (assigned_group_id, assigned_group_name, mut assigned_salesmen) = match owned {
                Some((group, members)) => {
                    // Enrich from the organization roster; child-group
                    // members who are not organization salesmen are ignored.
                    let assigned: Vec<UserSummary> = members
                        .iter()
                        .filter_map(|m| salesmen_by_id.get(m.id.as_str()))
                        .map(|roster_member| UserSummary::from_member(&roster_member.member))
                        .collect();
                    (Some(group.id.clone()), Some(group.name.clone()), assigned)
                }
                None => (None, None, Vec::new()),
            };
            dedup_by_id(&mut assigned_salesmen);
            sort_by_full_name(&mut assigned_salesmen);

            rows.push(ManagerRow {
                manager: summary,
                assigned_group_id,
                assigned_group_name,
                assigned_salesmen,
            });
        }
        rows.sort_by(|a, b| {
            a.manager
                .full_name
                .to_lowercase()
                .cmp(&b.manager.full_name.to_lowercase())
        });

        info!(
            organization_id = %organization_id,
            managers = rows.len(),
            available_salesmen = available_salesmen.len(),
            "Built assignment board"
        );

        Ok(AssignmentBoard {
            sales_manager_group: GroupSummary {
                id: root.id,
                name: root.name,
                path: root.path,
            },
            sales_managers: rows,
            available_salesmen,
        })
    }

    /// Applies an assign/unassign batch for one manager.
    pub async fn apply_assignment(
        &self,
        organization_id: &str,
        request: AssignmentRequest,
    ) -> Result<AssignmentOutcome, ApiError> {
        let action: AssignmentAction = request.action.parse().map_err(ApiError::Validation)?;

        if request.manager_user_id.trim().is_empty() {
            return Err(ApiError::Validation("managerUserId is required".to_string()));
        }

        // Deduplicate targets, preserving request order.
        let mut seen = HashSet::new();
        let targets: Vec<String> = request
            .salesman_user_ids
            .iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty() && seen.insert(id.clone()))
            .collect();
        if targets.is_empty() {
            return Err(ApiError::Validation(
                "at least one salesmanUserId is required".to_string(),
            ));
        }

        let roster = self.load_roster(organization_id).await?;
        let by_id: HashMap<&str, &MemberWithGroups> = roster
            .iter()
            .map(|m| (m.member.id.as_str(), m))
            .collect();

        let manager = *by_id
            .get(request.manager_user_id.as_str())
            .ok_or_else(|| {
                ApiError::NotFound("Manager was not found in the organization".to_string())
            })?;
        if !manager.is_sales_manager() {
            return Err(ApiError::Validation(
                "User is not a sales manager".to_string(),
            ));
        }
        let manager_summary = UserSummary::from_member(&manager.member);

        let missing: Vec<String> = targets
            .iter()
            .filter(|id| !by_id.contains_key(id.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ApiError::UsersNotInOrganization(missing));
        }

        // Unassign skips role re-validation: the point is removing a
        // possibly stale membership.
        if action == AssignmentAction::Assign {
            let invalid: Vec<String> = targets
                .iter()
                .filter(|id| by_id.get(id.as_str()).is_none_or(|m| !m.is_salesman()))
                .cloned()
                .collect();
            if !invalid.is_empty() {
                return Err(ApiError::InvalidSalesmen(invalid));
            }
        }

        let root = self.resolve_root_group().await?;
        let manager_ids: HashSet<String> = roster
            .iter()
            .filter(|m| m.is_sales_manager())
            .map(|m| m.member.id.clone())
            .collect();

        let mut children = self.child_groups_with_members(&root.id).await?;

        let target_index =
            match find_owned_index(&children, &manager_summary.id, &manager_ids) {
                Some(index) => index,
                None if action == AssignmentAction::Unassign => {
                    // Nothing to unassign from.
                    info!(
                        organization_id = %organization_id,
                        manager_user_id = %manager_summary.id,
                        "Unassign for manager without a child group, no-op"
                    );
                    return Ok(AssignmentOutcome {
                        success: true,
                        message: format!(
                            "{} has no assignment group; nothing to unassign",
                            manager_summary.full_name
                        ),
                        action,
                        manager_group: None,
                        assigned_user_ids: vec![],
                        unassigned_user_ids: vec![],
                        failed_assignments: vec![],
                    });
                }
                None => {
                    // Lazily create the manager's child group, then locate
                    // it by re-fetching. The directory gives no handle back
                    // on create; a concurrent create for the same manager
                    // can race here (see DESIGN.md).
                    let existing_names: Vec<String> =
                        children.iter().map(|(child, _)| child.name.clone()).collect();
                    let new_group = NewChildGroup::for_manager(&manager_summary, &existing_names);
                    info!(
                        organization_id = %organization_id,
                        manager_user_id = %manager_summary.id,
                        group_name = %new_group.name,
                        "Creating assignment group for manager"
                    );
                    self.directory.create_child_group(&root.id, &new_group).await?;

                    children = self.child_groups_with_members(&root.id).await?;
                    children
                        .iter()
                        .position(|(child, _)| child.name == new_group.name)
                        .ok_or_else(|| {
                            ApiError::Internal(format!(
                                "Created group \"{}\" could not be found",
                                new_group.name
                            ))
                        })?
                }
            };

        let target_group_id = children[target_index].0.id.clone();
        let target_group_name = children[target_index].0.name.clone();
        let target_group_path = children[target_index].0.path.clone();

        // A salesman may belong to at most one manager's child group.
        // Reject the whole batch when any target already sits elsewhere.
        if action == AssignmentAction::Assign {
            let mut conflicts: Vec<AssignmentConflict> = Vec::new();
            for (child, members) in &children {
                if child.id == target_group_id {
                    continue;
                }
                for target in &targets {
                    if members.iter().any(|m| &m.id == target) {
                        conflicts.push(AssignmentConflict {
                            salesman_user_id: target.clone(),
                            assigned_group_id: child.id.clone(),
                        });
                    }
                }
            }
            if !conflicts.is_empty() {
                return Err(ApiError::Conflicts(conflicts));
            }
        }

        // Already-satisfied targets are skipped silently.
        let current_members: HashSet<&str> = children[target_index]
            .1
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        let work: Vec<String> = match action {
            AssignmentAction::Assign => targets
                .iter()
                .filter(|id| !current_members.contains(id.as_str()))
                .cloned()
                .collect(),
            AssignmentAction::Unassign => targets
                .iter()
                .filter(|id| current_members.contains(id.as_str()))
                .cloned()
                .collect(),
        };

        // Sequential, best-effort: each failure is recorded and the rest
        // of the batch still runs. Nothing is rolled back.
        let mut applied: Vec<String> = Vec::new();
        let mut failed: Vec<FailedAssignment> = Vec::new();
        for user_id in &work {
            let result = match action {
                AssignmentAction::Assign => {
                    self.directory.add_user_to_group(user_id, &target_group_id).await
                }
                AssignmentAction::Unassign => {
                    self.directory
                        .remove_user_from_group(user_id, &target_group_id)
                        .await
                }
            };
            match result {
                Ok(()) => applied.push(user_id.clone()),
                Err(err) => {
                    warn!(
                        user_id = %user_id,
                        group_id = %target_group_id,
                        error = %err,
                        "Assignment mutation failed"
                    );
                    failed.push(FailedAssignment {
                        user_id: user_id.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        record_assignment_mutations(&action.to_string(), applied.len(), failed.len());

        let mut message = match action {
            AssignmentAction::Assign => format!(
                "Assigned {} salesman(s) to {}",
                applied.len(),
                manager_summary.full_name
            ),
            AssignmentAction::Unassign => format!(
                "Unassigned {} salesman(s) from {}",
                applied.len(),
                manager_summary.full_name
            ),
        };
        if !failed.is_empty() {
            message = format!("{}; {} mutation(s) failed", message, failed.len());
        }

        info!(
            organization_id = %organization_id,
            manager_user_id = %manager_summary.id,
            action = %action,
            applied = applied.len(),
            failed = failed.len(),
            "Applied assignment batch"
        );

        let (assigned_user_ids, unassigned_user_ids) = match action {
            AssignmentAction::Assign => (applied, vec![]),
            AssignmentAction::Unassign => (vec![], applied),
        };

        Ok(AssignmentOutcome {
            success: failed.is_empty(),
            message,
            action,
            manager_group: Some(GroupSummary {
                id: target_group_id,
                name: target_group_name,
                path: target_group_path,
            }),
            assigned_user_ids,
            unassigned_user_ids,
            failed_assignments: failed,
        })
    }

    /// Loads the organization roster with per-member group memberships.
    ///
    /// Group lookups fan out concurrently; an individual failure degrades
    /// that member to an empty group list instead of failing the roster.
    /// Partial data beats an erroring page here.
    async fn load_roster(
        &self,
        organization_id: &str,
    ) -> Result<Vec<MemberWithGroups>, ApiError> {
        let mut members: Vec<OrgMember> = Vec::new();
        let mut first = 0;
        loop {
            let page = self
                .directory
                .list_org_members(organization_id, first, self.member_page_size)
                .await?;
            let page_len = page.len();
            members.extend(page);
            if page_len < self.member_page_size {
                break;
            }
            first += page_len;
        }

        let lookups = members.iter().map(|member| {
            let directory = Arc::clone(&self.directory);
            let user_id = member.id.clone();
            async move { directory.list_user_groups(&user_id).await }
        });
        let group_lists = join_all(lookups).await;

        Ok(members
            .into_iter()
            .zip(group_lists)
            .map(|(member, groups)| {
                let groups = match groups {
                    Ok(groups) => groups,
                    Err(err) => {
                        warn!(
                            user_id = %member.id,
                            error = %err,
                            "Group lookup failed, treating member as having no groups"
                        );
                        Vec::new()
                    }
                };
                MemberWithGroups { member, groups }
            })
            .collect())
    }

    /// Resolves the root "Sales Manager" group, a distinguished 404 when absent.
    async fn resolve_root_group(&self) -> Result<DirectoryGroup, ApiError> {
        let groups = self.directory.list_groups().await?;
        groups
            .into_iter()
            .find(|group| roles::is_sales_manager_group_name(&group.name))
            .ok_or_else(|| ApiError::NotFound(ROOT_GROUP_MISSING.to_string()))
    }

    /// Fetches the root's child groups together with their members.
    async fn child_groups_with_members(
        &self,
        root_id: &str,
    ) -> Result<Vec<ChildGroup>, ApiError> {
        let children = self.directory.list_group_children(root_id).await?;
        let mut result = Vec::with_capacity(children.len());
        for child in children {
            let members = self.directory.list_group_members(&child.id).await?;
            result.push((child, members));
        }
        Ok(result)
    }
}

/// Resolves the manager owning a child group: the `managerUserId`
/// attribute wins; otherwise the first member who is a classified sales
/// manager.
fn resolve_owner(
    child: &DirectoryGroup,
    members: &[OrgMember],
    manager_ids: &HashSet<String>,
) -> Option<String> {
    if let Some(owner) = child.first_attribute(ATTR_MANAGER_USER_ID) {
        return Some(owner.to_string());
    }
    members
        .iter()
        .find(|member| manager_ids.contains(&member.id))
        .map(|member| member.id.clone())
}

fn find_owned_index(
    children: &[ChildGroup],
    manager_id: &str,
    manager_ids: &HashSet<String>,
) -> Option<usize> {
    children.iter().position(|(child, members)| {
        resolve_owner(child, members, manager_ids).as_deref() == Some(manager_id)
    })
}

fn dedup_by_id(users: &mut Vec<UserSummary>) {
    let mut seen = HashSet::new();
    users.retain(|user| seen.insert(user.id.clone()));
}

fn sort_by_full_name(users: &mut [UserSummary]) {
    users.sort_by(|a, b| a.full_name.to_lowercase().cmp(&b.full_name.to_lowercase()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use directory::InMemoryDirectory;
    use std::collections::HashMap as StdHashMap;

    fn user(id: &str, first: &str, last: &str) -> OrgMember {
        OrgMember {
            id: id.to_string(),
            username: Some(format!("{}.{}", first, last).to_lowercase()),
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            email: Some(format!("{}@example.com", first).to_lowercase()),
            enabled: Some(true),
        }
    }

    fn seed_org(directory: &InMemoryDirectory, org: &str, users: &[OrgMember]) {
        for u in users {
            directory.insert_user(u.clone());
            directory.add_org_member(org, &u.id);
        }
    }

    #[tokio::test]
    async fn roster_loading_pages_through_members() {
        let directory = Arc::new(InMemoryDirectory::new());
        let users: Vec<OrgMember> = (0..5)
            .map(|i| user(&format!("u-{}", i), &format!("First{}", i), "Last"))
            .collect();
        seed_org(&directory, "org-1", &users);

        // Page size 2 forces three directory round trips.
        let service = AssignmentService::new(directory, 2);
        let roster = service.load_roster("org-1").await.unwrap();
        assert_eq!(roster.len(), 5);
    }

    #[tokio::test]
    async fn roster_degrades_failed_group_lookups_to_empty() {
        let directory = Arc::new(InMemoryDirectory::new());
        let users = vec![user("u-1", "Jane", "Doe"), user("u-2", "John", "Roe")];
        seed_org(&directory, "org-1", &users);
        let salesman_group = directory.create_group("Salesman");
        directory.join_group("u-1", &salesman_group);
        directory.join_group("u-2", &salesman_group);
        directory.fail_user_groups("u-2");

        let service = AssignmentService::new(directory, 1000);
        let roster = service.load_roster("org-1").await.unwrap();

        let u1 = roster.iter().find(|m| m.member.id == "u-1").unwrap();
        let u2 = roster.iter().find(|m| m.member.id == "u-2").unwrap();
        assert_eq!(u1.groups.len(), 1);
        assert!(u2.groups.is_empty());
    }

    #[tokio::test]
    async fn owner_resolution_falls_back_to_membership() {
        let directory = Arc::new(InMemoryDirectory::new());
        let manager = user("mgr-1", "Jane", "Doe");
        let salesman = user("s-1", "Sam", "Seller");
        seed_org(&directory, "org-1", &[manager.clone(), salesman.clone()]);

        let root = directory.create_group("Sales Manager");
        let salesman_group = directory.create_group("Salesman");
        directory.join_group("mgr-1", &root);
        directory.join_group("s-1", &salesman_group);

        // Untagged child group: ownership must come from membership.
        let child = directory.create_child(&root, "Legacy Team", StdHashMap::new());
        directory.join_group("mgr-1", &child);
        directory.join_group("s-1", &child);

        let service = AssignmentService::new(directory, 1000);
        let board = service.assignment_board("org-1").await.unwrap();

        assert_eq!(board.sales_managers.len(), 1);
        let row = &board.sales_managers[0];
        assert_eq!(row.manager.id, "mgr-1");
        assert_eq!(row.assigned_group_name.as_deref(), Some("Legacy Team"));
        assert_eq!(row.assigned_salesmen.len(), 1);
        assert_eq!(row.assigned_salesmen[0].id, "s-1");
        assert!(board.available_salesmen.is_empty());
    }

    #[tokio::test]
    async fn board_sorts_by_full_name() {
        let directory = Arc::new(InMemoryDirectory::new());
        let mgr_b = user("mgr-b", "Zoe", "Young");
        let mgr_a = user("mgr-a", "Amy", "Able");
        let s_b = user("s-b", "Yan", "Zeta");
        let s_a = user("s-a", "Bob", "Alpha");
        seed_org(
            &directory,
            "org-1",
            &[mgr_b.clone(), mgr_a.clone(), s_b.clone(), s_a.clone()],
        );

        let root = directory.create_group("Sales Manager");
        let salesman_group = directory.create_group("Salesman");
        directory.join_group("mgr-a", &root);
        directory.join_group("mgr-b", &root);
        directory.join_group("s-a", &salesman_group);
        directory.join_group("s-b", &salesman_group);

        let service = AssignmentService::new(directory, 1000);
        let board = service.assignment_board("org-1").await.unwrap();

        let manager_names: Vec<&str> = board
            .sales_managers
            .iter()
            .map(|row| row.manager.full_name.as_str())
            .collect();
        assert_eq!(manager_names, vec!["Amy Able", "Zoe Young"]);

        let available: Vec<&str> = board
            .available_salesmen
            .iter()
            .map(|s| s.full_name.as_str())
            .collect();
        assert_eq!(available, vec!["Bob Alpha", "Yan Zeta"]);
    }
}
