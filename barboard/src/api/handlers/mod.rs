//! Axum route handlers.
//!
//! - [`relay`]: `/api/backend/*`, one upstream call per request
//! - [`views`]: `/views/*`, aggregated dashboard and product board, including the live board

pub mod relay;
pub mod views;
