//! The signed-in user as reported by the upstream `/account` endpoint.

use serde::{Deserialize, Serialize};

use crate::types::OrganizationId;

/// Users are keyed by a number on some upstream deployments and by an opaque string on others.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Numeric(i64),
    Text(String),
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserId::Numeric(id) => write!(f, "{id}"),
            UserId::Text(id) => f.write_str(id),
        }
    }
}

/// Root of the dashboard view. When the upstream cannot resolve one, the view is
/// unauthenticated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: UserId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<OrganizationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_onboarding: Option<bool>,
}

impl CurrentUser {
    pub const ADMIN_ROLE: &'static str = "ADMIN";

    /// Only admins may edit organization settings; the upstream enforces the same rule.
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(Self::ADMIN_ROLE)
    }
}
