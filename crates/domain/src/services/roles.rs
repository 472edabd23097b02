//! Sales-role classification from directory group membership.
//!
//! Roles are derived purely from group names, never from a stored
//! attribute. Matching is case- and punctuation-insensitive so that
//! "Sales Manager", "sales-managers" and "SALESMANAGER" all denote the
//! same root group.

use crate::models::group::GroupRef;
use crate::models::member::MemberWithGroups;

/// Normalizes a group name for matching: lowercases and strips every
/// non-alphanumeric character.
pub fn normalize_token(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// True if the name denotes the sales-manager group (singular or plural).
pub fn is_sales_manager_group_name(name: &str) -> bool {
    matches!(normalize_token(name).as_str(), "salesmanager" | "salesmanagers")
}

/// True if the name denotes the salesman group (singular or plural).
pub fn is_salesman_group_name(name: &str) -> bool {
    matches!(normalize_token(name).as_str(), "salesman" | "salesmen")
}

/// True if any group name satisfies the matcher.
pub fn has_group(groups: &[GroupRef], matcher: impl Fn(&str) -> bool) -> bool {
    groups.iter().any(|group| matcher(&group.name))
}

impl MemberWithGroups {
    /// True if this member belongs to a sales-manager group.
    pub fn is_sales_manager(&self) -> bool {
        has_group(&self.groups, is_sales_manager_group_name)
    }

    /// True if this member is classified as a salesman.
    ///
    /// Manager membership takes precedence: a member in both group
    /// families is classified only as a manager.
    pub fn is_salesman(&self) -> bool {
        !self.is_sales_manager() && has_group(&self.groups, is_salesman_group_name)
    }
}

/// Partition of an organization roster into sales managers and salesmen.
///
/// The two partitions are mutually exclusive by construction; members in
/// neither group family are dropped.
#[derive(Debug, Clone, Default)]
pub struct RolePartition {
    pub managers: Vec<MemberWithGroups>,
    pub salesmen: Vec<MemberWithGroups>,
}

/// Classifies a roster into managers and salesmen with manager precedence.
pub fn partition_roles(roster: &[MemberWithGroups]) -> RolePartition {
    let mut partition = RolePartition::default();
    for member in roster {
        if member.is_sales_manager() {
            partition.managers.push(member.clone());
        } else if member.is_salesman() {
            partition.salesmen.push(member.clone());
        }
    }
    partition
}
