//! HTTP handlers for the relay routes under `/api/backend`.
//!
//! Each handler forwards exactly one call; see [`crate::relay`] for how responses are mapped.

use axum::extract::{Path, RawQuery, State};
use bytes::Bytes;

use crate::AppState;
use crate::relay::{RelayRequest, RelayResponse, Resource};
use crate::session::SessionCredential;

#[tracing::instrument(skip_all, fields(organization_id = %id))]
pub async fn get_organization(
    State(state): State<AppState>,
    Path(id): Path<String>,
    credential: SessionCredential,
) -> RelayResponse {
    state
        .relay
        .forward(RelayRequest::get(Resource::Organization(id), &credential))
        .await
}

#[tracing::instrument(skip_all, fields(organization_id = %id))]
pub async fn update_organization(
    State(state): State<AppState>,
    Path(id): Path<String>,
    credential: SessionCredential,
    body: Bytes,
) -> RelayResponse {
    state
        .relay
        .forward(RelayRequest::put(Resource::Organization(id), &credential, body))
        .await
}

#[tracing::instrument(skip_all)]
pub async fn get_account(State(state): State<AppState>, credential: SessionCredential) -> RelayResponse {
    state.relay.forward(RelayRequest::get(Resource::Account, &credential)).await
}

#[tracing::instrument(skip_all)]
pub async fn get_sales_stats(State(state): State<AppState>, credential: SessionCredential) -> RelayResponse {
    state.relay.forward(RelayRequest::get(Resource::SalesStats, &credential)).await
}

#[tracing::instrument(skip_all)]
pub async fn get_station_sales_stats(State(state): State<AppState>, credential: SessionCredential) -> RelayResponse {
    state
        .relay
        .forward(RelayRequest::get(Resource::StationSalesStats, &credential))
        .await
}

#[tracing::instrument(skip_all)]
pub async fn list_categories(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    credential: SessionCredential,
) -> RelayResponse {
    state
        .relay
        .forward(RelayRequest::get(Resource::Categories, &credential).with_query(query))
        .await
}

#[tracing::instrument(skip_all)]
pub async fn list_inventory(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    credential: SessionCredential,
) -> RelayResponse {
    state
        .relay
        .forward(RelayRequest::get(Resource::Inventory, &credential).with_query(query))
        .await
}
