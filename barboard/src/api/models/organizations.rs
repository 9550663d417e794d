//! Organization detail and the admin update payload.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::OrganizationId;

/// Organization as returned by the upstream `/organizations/{id}` endpoint.
///
/// Every field is optional at decode time: a payload without a usable name still resolves,
/// and the dashboard labels it as an unknown organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(default)]
    pub id: Option<OrganizationId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub price_increase_step: Option<Decimal>,
    #[serde(default)]
    pub price_decrease_step: Option<Decimal>,
}

impl Organization {
    /// The organization's name, if the upstream supplied a non-blank one.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.trim().is_empty())
    }
}

/// Body of `PUT /organizations/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationUpdate {
    pub name: String,
    #[serde(default)]
    pub price_increase_step: Option<Decimal>,
    #[serde(default)]
    pub price_decrease_step: Option<Decimal>,
}

/// Outcome of the dashboard's organization update once the upstream has confirmed it.
#[derive(Debug, Clone, PartialEq)]
pub struct OrganizationUpdated {
    pub organization: Organization,
    pub message: String,
}
