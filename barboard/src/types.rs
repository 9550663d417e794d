//! Identifier types shared by the upstream models and the views.
//!
//! The upstream service keys every entity by a numeric id, except users which may be
//! identified by either a number or an opaque string (see
//! [`crate::api::models::account::UserId`]).

pub type OrganizationId = i64;
pub type CategoryId = i64;
pub type StationId = i64;
pub type ProductId = i64;
pub type InventoryItemId = i64;
