//! HTTP handlers for the aggregated views under `/views`.

use std::convert::Infallible;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::AppState;
use crate::errors::{Error, Result};
use crate::session::SessionCredential;
use crate::types::OrganizationId;
use crate::views::{self, DashboardView, OrganizationSettings, Poller, ProductBoardView};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductBoardQuery {
    pub organization_id: Option<OrganizationId>,
}

impl ProductBoardQuery {
    fn resolve(&self, state: &AppState) -> Result<OrganizationId> {
        self.organization_id
            .or(state.config.product_board.organization_id)
            .ok_or_else(|| Error::BadRequest {
                message: "organizationId is required".to_string(),
            })
    }
}

impl IntoResponse for DashboardView {
    fn into_response(self) -> Response {
        let status = match &self {
            DashboardView::Ready(_) => StatusCode::OK,
            DashboardView::Unauthenticated => StatusCode::UNAUTHORIZED,
            DashboardView::Failed { .. } => StatusCode::BAD_GATEWAY,
        };
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for ProductBoardView {
    fn into_response(self) -> Response {
        let status = match &self {
            ProductBoardView::Ready(_) => StatusCode::OK,
            ProductBoardView::Failed { .. } => StatusCode::BAD_GATEWAY,
        };
        (status, Json(self)).into_response()
    }
}

/// Loads the dashboard once. Leaving before it completes tears the aggregation down.
#[tracing::instrument(skip_all)]
pub async fn get_dashboard(State(state): State<AppState>, credential: SessionCredential) -> Result<DashboardView> {
    let relay = state.relay.clone();
    let poller = Poller::spawn(None, move |token: CancellationToken| {
        let relay = relay.clone();
        let credential = credential.clone();
        async move { views::load_dashboard(&relay, &credential, &token).await }
    });

    poller.into_updates().next().await.ok_or_else(|| Error::Internal {
        operation: "load dashboard".to_string(),
    })
}

/// Saves the submitted settings form and returns it with the outcome applied.
#[tracing::instrument(skip_all)]
pub async fn update_organization(
    State(state): State<AppState>,
    credential: SessionCredential,
    Json(mut settings): Json<OrganizationSettings>,
) -> (StatusCode, Json<OrganizationSettings>) {
    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();

    let result = views::update_organization(&state.relay, &credential, &settings.to_update(), &token).await;
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            warn!(error = %e, "Organization settings not saved");
            e.status_code()
        }
    };

    settings.apply(&result);
    (status, Json(settings))
}

#[tracing::instrument(skip_all)]
pub async fn get_products(
    State(state): State<AppState>,
    Query(query): Query<ProductBoardQuery>,
    credential: SessionCredential,
) -> Result<ProductBoardView> {
    let organization_id = query.resolve(&state)?;

    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();

    Ok(views::load_product_board(&state.relay, &credential, organization_id, &token).await)
}

/// Every committed product board for as long as the returned stream is held.
fn product_updates(
    state: &AppState,
    credential: SessionCredential,
    organization_id: OrganizationId,
) -> impl Stream<Item = ProductBoardView> + Send + use<> {
    let relay = state.relay.clone();
    let period = state.config.product_board.refresh_interval;

    Poller::spawn(Some(period), move |token: CancellationToken| {
        let relay = relay.clone();
        let credential = credential.clone();
        async move { views::load_product_board(&relay, &credential, organization_id, &token).await }
    })
    .into_updates()
}

/// Streams the product board as server-sent events, re-fetched every refresh interval.
#[tracing::instrument(skip_all)]
pub async fn stream_products(
    State(state): State<AppState>,
    Query(query): Query<ProductBoardQuery>,
    credential: SessionCredential,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let organization_id = query.resolve(&state)?;
    debug!(organization_id, "Live product board opened");

    let stream = product_updates(&state, credential, organization_id).filter_map(|view| async move {
        match Event::default().event("products").json_data(&view) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                warn!(error = %e, "Failed to encode product board event");
                None
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
