//! Product-price board: every category's items with their price movement.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use super::{CallError, call_listing, pricing::CategoryGroup, pricing::group_by_category};
use crate::api::models::inventory::{Category, InventoryItem};
use crate::relay::{Relay, RelayRequest, Resource};
use crate::session::SessionCredential;
use crate::types::OrganizationId;

const LOAD_FAILED: &str = "Failed to load products";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProductBoardView {
    Ready(ProductBoard),
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductBoard {
    pub organization_id: OrganizationId,
    pub groups: Vec<CategoryGroup>,
    pub total_items: usize,
    pub refreshed_at: DateTime<Utc>,
}

fn query(pairs: &[(&str, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Loads the categories of an organization, then every category's inventory in parallel.
///
/// A failed category list fails the board; a failed inventory call only drops its category.
#[instrument(skip(relay, credential, token))]
pub async fn load_product_board(
    relay: &Relay,
    credential: &SessionCredential,
    organization_id: OrganizationId,
    token: &CancellationToken,
) -> ProductBoardView {
    let request = RelayRequest::get(Resource::Categories, credential)
        .with_query(Some(query(&[("organizationId", organization_id.to_string())])));

    let categories: Vec<Category> = match call_listing(relay, token, request).await {
        Ok(categories) => categories,
        Err(CallError::Status(status)) => {
            return ProductBoardView::Failed {
                error: format!("Categories HTTP {}", status.as_u16()),
            };
        }
        Err(e) => {
            warn!(error = %e, "Category list unavailable");
            return ProductBoardView::Failed {
                error: LOAD_FAILED.to_string(),
            };
        }
    };

    let fetches = categories.into_iter().map(|category| async move {
        let request = RelayRequest::get(Resource::Inventory, credential).with_query(Some(query(&[
            ("categoryId", category.id.to_string()),
            ("organizationId", organization_id.to_string()),
        ])));
        match call_listing::<InventoryItem>(relay, token, request).await {
            Ok(items) => Some((category, items)),
            Err(e) => {
                warn!(category_id = category.id, error = %e, "Dropping category without inventory");
                None
            }
        }
    });
    let fetched: Vec<(Category, Vec<InventoryItem>)> = join_all(fetches).await.into_iter().flatten().collect();

    let groups = group_by_category(fetched);
    let total_items = groups.iter().map(|group| group.items.len()).sum();

    ProductBoardView::Ready(ProductBoard {
        organization_id,
        groups,
        total_items,
        refreshed_at: Utc::now(),
    })
}
