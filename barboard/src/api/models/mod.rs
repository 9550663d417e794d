//! Upstream data contract.
//!
//! These structures mirror the JSON payloads of the upstream service (camelCase on the wire)
//! and are re-emitted unchanged in shape by the views.
//!
//! - [`account`]: the signed-in user
//! - [`organizations`]: organization detail and the admin update payload
//! - [`sales`]: per-user and per-station leaderboard rows
//! - [`inventory`]: categories and inventory items for the product board

pub mod account;
pub mod inventory;
pub mod organizations;
pub mod sales;
