//! Dashboard view: the signed-in user, their organization and the two sales leaderboards.

use axum::http::StatusCode;
use bytes::Bytes;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::{CallError, call_json};
use crate::api::models::{
    account::CurrentUser,
    organizations::{Organization, OrganizationUpdate, OrganizationUpdated},
    sales::{StationSalesStat, UserSalesStat},
};
use crate::errors::{Error, Result};
use crate::relay::{Relay, RelayRequest, Resource};
use crate::session::SessionCredential;

pub const UNKNOWN_ORGANIZATION: &str = "Unknown Organization";
pub const NO_ORGANIZATION: &str = "No organization";
pub const UPDATE_SUCCEEDED: &str = "Organization updated successfully";
const LOAD_FAILED: &str = "Failed to load dashboard";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DashboardView {
    /// The upstream did not accept the session credential.
    Unauthenticated,
    /// The account lookup failed for another reason.
    Failed { error: String },
    Ready(Box<Dashboard>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub user: CurrentUser,
    pub organization_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<Organization>,
    /// Present for admins whose organization loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<OrganizationSettings>,
    pub user_stats: Vec<UserSalesStat>,
    pub station_stats: Vec<StationSalesStat>,
}

/// Form model behind the admin's organization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSettings {
    pub name: String,
    #[serde(default)]
    pub price_increase_step: Option<Decimal>,
    #[serde(default)]
    pub price_decrease_step: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_error: Option<String>,
}

impl OrganizationSettings {
    pub fn from_organization(organization: &Organization) -> Self {
        Self {
            name: organization.name.clone().unwrap_or_default(),
            price_increase_step: organization.price_increase_step,
            price_decrease_step: organization.price_decrease_step,
            save_message: None,
            save_error: None,
        }
    }

    /// The update body for the current form values.
    pub fn to_update(&self) -> OrganizationUpdate {
        OrganizationUpdate {
            name: self.name.clone(),
            price_increase_step: self.price_increase_step,
            price_decrease_step: self.price_decrease_step,
        }
    }

    /// Applies the outcome of a save. Values change only once the upstream has confirmed them;
    /// a failed save keeps the edited values.
    pub fn apply(&mut self, result: &Result<OrganizationUpdated>) {
        match result {
            Ok(updated) => {
                *self = Self::from_organization(&updated.organization);
                self.save_message = Some(updated.message.clone());
            }
            Err(e) => {
                self.save_message = None;
                self.save_error = Some(e.user_message());
            }
        }
    }
}

/// Resolves the signed-in user, then loads the organization and both leaderboards concurrently.
///
/// Only the account lookup can fail the view. A failed organization call labels the
/// organization as unknown and a failed stats call leaves that leaderboard empty.
#[instrument(skip_all)]
pub async fn load_dashboard(relay: &Relay, credential: &SessionCredential, token: &CancellationToken) -> DashboardView {
    let user: CurrentUser = match call_json(relay, token, RelayRequest::get(Resource::Account, credential)).await {
        Ok(user) => user,
        Err(CallError::Status(StatusCode::UNAUTHORIZED)) => return DashboardView::Unauthenticated,
        Err(CallError::Status(status)) => {
            return DashboardView::Failed {
                error: format!("Failed user fetch: {}", status.as_u16()),
            };
        }
        Err(e) => {
            warn!(error = %e, "Account lookup failed");
            return DashboardView::Failed {
                error: LOAD_FAILED.to_string(),
            };
        }
    };

    let Some(organization_id) = user.organization_id else {
        debug!(user = %user.id, "User has no organization");
        return DashboardView::Ready(Box::new(Dashboard {
            user,
            organization_name: NO_ORGANIZATION.to_string(),
            organization: None,
            settings: None,
            user_stats: Vec::new(),
            station_stats: Vec::new(),
        }));
    };

    let (organization, user_stats, station_stats) = tokio::join!(
        call_json::<Organization>(
            relay,
            token,
            RelayRequest::get(Resource::Organization(organization_id.to_string()), credential),
        ),
        call_json::<Vec<UserSalesStat>>(relay, token, RelayRequest::get(Resource::SalesStats, credential)),
        call_json::<Vec<StationSalesStat>>(relay, token, RelayRequest::get(Resource::StationSalesStats, credential)),
    );

    let organization = organization
        .inspect_err(|e| warn!(organization_id, error = %e, "Organization unavailable"))
        .ok();
    let user_stats = user_stats
        .inspect_err(|e| warn!(error = %e, "User sales stats unavailable"))
        .unwrap_or_default();
    let station_stats = station_stats
        .inspect_err(|e| warn!(error = %e, "Station sales stats unavailable"))
        .unwrap_or_default();

    let organization_name = organization
        .as_ref()
        .and_then(Organization::display_name)
        .unwrap_or(UNKNOWN_ORGANIZATION)
        .to_string();
    let settings = organization
        .as_ref()
        .filter(|_| user.is_admin())
        .map(OrganizationSettings::from_organization);

    DashboardView::Ready(Box::new(Dashboard {
        user,
        organization_name,
        organization,
        settings,
        user_stats,
        station_stats,
    }))
}

/// Saves the signed-in user's organization.
///
/// Nothing is written on the way: the caller sees either the organization as the upstream
/// stored it, or an error and the state it had before.
#[instrument(skip_all)]
pub async fn update_organization(
    relay: &Relay,
    credential: &SessionCredential,
    update: &OrganizationUpdate,
    token: &CancellationToken,
) -> Result<OrganizationUpdated> {
    let user: CurrentUser = match call_json(relay, token, RelayRequest::get(Resource::Account, credential)).await {
        Ok(user) => user,
        Err(CallError::Status(StatusCode::UNAUTHORIZED)) => return Err(Error::Unauthenticated),
        Err(e) => {
            return Err(Error::Other(
                anyhow::Error::new(e).context("resolving account before organization update"),
            ));
        }
    };

    let organization_id = user.organization_id.ok_or_else(|| Error::BadRequest {
        message: "User has no organization".to_string(),
    })?;

    let body = Bytes::from(serde_json::to_vec(update).map_err(anyhow::Error::from)?);
    let request = RelayRequest::put(Resource::Organization(organization_id.to_string()), credential, body);

    match call_json::<Organization>(relay, token, request).await {
        Ok(organization) => Ok(OrganizationUpdated {
            organization,
            message: UPDATE_SUCCEEDED.to_string(),
        }),
        Err(CallError::Status(status)) => Err(Error::UpdateFailed { status }),
        Err(e) => {
            warn!(organization_id, error = %e, "Organization update did not complete");
            Err(Error::Internal {
                operation: "update organization".to_string(),
            })
        }
    }
}
