//! Organization member domain models.
//!
//! Members are sourced fresh from the identity directory on every request;
//! nothing in this service caches them across requests.

use serde::{Deserialize, Serialize};

use crate::models::group::GroupRef;

/// Fallback display name for a member with no usable identity fields.
pub const UNKNOWN_USER_NAME: &str = "Unknown User";

/// A member of an organization, as returned by the directory admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgMember {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// An organization member together with their directory group memberships.
///
/// The group list is obtained through a secondary per-user lookup. A failed
/// lookup degrades to an empty list rather than failing the whole roster.
#[derive(Debug, Clone)]
pub struct MemberWithGroups {
    pub member: OrgMember,
    pub groups: Vec<GroupRef>,
}

/// Per-request view model projecting a member for API responses.
///
/// `full_name` is derived: "first last" when either name part is present,
/// else username, else email, else a fixed placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    pub full_name: String,
}

impl UserSummary {
    /// Projects a raw member record into a summary.
    pub fn from_member(member: &OrgMember) -> Self {
        Self {
            id: member.id.clone(),
            username: member.username.clone(),
            first_name: member.first_name.clone(),
            last_name: member.last_name.clone(),
            email: member.email.clone(),
            enabled: member.enabled,
            full_name: derive_full_name(member),
        }
    }
}

impl From<&OrgMember> for UserSummary {
    fn from(member: &OrgMember) -> Self {
        Self::from_member(member)
    }
}

/// Derives a display name from whatever identity fields are populated.
fn derive_full_name(member: &OrgMember) -> String {
    let first = member.first_name.as_deref().unwrap_or("").trim();
    let last = member.last_name.as_deref().unwrap_or("").trim();
    let name = format!("{} {}", first, last).trim().to_string();
    if !name.is_empty() {
        return name;
    }
    if let Some(username) = member.username.as_deref().filter(|u| !u.trim().is_empty()) {
        return username.trim().to_string();
    }
    if let Some(email) = member.email.as_deref().filter(|e| !e.trim().is_empty()) {
        return email.trim().to_string();
    }
    UNKNOWN_USER_NAME.to_string()
}
