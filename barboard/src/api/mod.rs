//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all endpoints
//! - **[`models`]**: Wire types shared with the upstream service
//!
//! # API Structure
//!
//! - **Relay** (`/api/backend/*`): organization, account, sales statistics, categories and
//!   inventory, forwarded to the upstream with the caller's session cookie
//! - **Views** (`/views/*`): the dashboard, the organization settings update and the product board
//! - **Health** (`/healthz`): liveness of this service, independent of the upstream

pub mod handlers;
pub mod models;
