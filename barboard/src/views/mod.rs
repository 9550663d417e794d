//! View aggregation: the dashboard and the product-price board.
//!
//! Each view is assembled from several upstream calls issued through the [`Relay`]. Calls that
//! do not depend on each other run concurrently, and each one fails on its own: only the
//! account lookup (dashboard) and the category list (product board) can fail a whole view.
//! Every aggregation takes a [`CancellationToken`]; once it is cancelled no further upstream
//! call is started, while calls already in flight are left to finish.

pub mod dashboard;
pub mod poller;
pub mod pricing;
pub mod products;

use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::relay::{Relay, RelayBody, RelayRequest, RelayResponse};
use crate::upstream::{Listing, ListingShape};

pub use dashboard::{Dashboard, DashboardView, OrganizationSettings, load_dashboard, update_organization};
pub use poller::{Poller, PollerUpdates};
pub use pricing::{CategoryGroup, PriceDirection, PricedItem};
pub use products::{ProductBoard, ProductBoardView, load_product_board};

/// Why a single upstream call produced no usable value.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("upstream answered {0}")]
    Status(StatusCode),

    #[error("could not reach upstream for {0}")]
    Transport(&'static str),

    #[error("malformed upstream payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("view was torn down before the call was issued")]
    Cancelled,
}

impl CallError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CallError::Status(status) => Some(*status),
            _ => None,
        }
    }
}

/// Issues one call unless the view is already torn down, and returns its JSON body on success.
async fn call(relay: &Relay, token: &CancellationToken, request: RelayRequest) -> Result<Value, CallError> {
    if token.is_cancelled() {
        return Err(CallError::Cancelled);
    }

    match relay.forward(request).await {
        RelayResponse::Upstream {
            status,
            body: RelayBody::Json(value),
        } if status.is_success() => Ok(value),
        RelayResponse::Upstream { status, .. } => Err(CallError::Status(status)),
        RelayResponse::TransportFailure { resource } => Err(CallError::Transport(resource)),
    }
}

async fn call_json<T: DeserializeOwned>(
    relay: &Relay,
    token: &CancellationToken,
    request: RelayRequest,
) -> Result<T, CallError> {
    let value = call(relay, token, request).await?;
    Ok(serde_json::from_value(value)?)
}

/// Like [`call_json`] for list endpoints that may wrap their records in an envelope.
async fn call_listing<T: DeserializeOwned>(
    relay: &Relay,
    token: &CancellationToken,
    request: RelayRequest,
) -> Result<Vec<T>, CallError> {
    let resource = request.resource.label();
    let listing = Listing::<T>::from_value(call(relay, token, request).await?)?;
    if listing.shape == ListingShape::Missing {
        warn!(resource, "Upstream list payload had no recognizable records");
    }
    Ok(listing.records)
}
