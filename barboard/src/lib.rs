//! # barboard: dashboard backend for a multi-station bar
//!
//! `barboard` sits between the browser and the bar's upstream API. The browser only ever talks to
//! `barboard`, carrying its session cookie; `barboard` forwards that cookie on every upstream call
//! and never interprets it. Authentication is entirely the upstream's business.
//!
//! ## Surfaces
//!
//! - **Relay** (`/api/backend/*`): one inbound call becomes one upstream call. Status and body
//!   come back as the upstream sent them; only a transport failure is replaced by a fixed
//!   `{"error": "Failed to fetch <resource>"}` with status 500. See [`relay`].
//! - **Views** (`/views/*`): aggregated read models. The dashboard resolves the signed-in user
//!   and then loads their organization and the two sales leaderboards concurrently; the product
//!   board loads an organization's categories and then every category's inventory in parallel.
//!   Individual sources fail in isolation. See [`views`].
//! - **Live board** (`/views/products/live`): a server-sent event stream fed by a [`Poller`] that
//!   re-runs the product aggregation on `product_board.refresh_interval`. The poller is torn
//!   down when the client goes away, and results that land afterwards are discarded.
//!
//! ## Configuration
//!
//! See [`config`] for the YAML layout and `BARBOARD_` environment overrides.
//!
//! [`Poller`]: views::Poller

pub mod api;
pub mod config;
pub mod errors;
pub mod relay;
pub mod session;
pub mod telemetry;
pub mod types;
pub mod upstream;
pub mod views;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;

use axum::{
    Json, Router,
    http::{self, HeaderValue},
    routing::{get, put},
};
use bon::Builder;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};

pub use config::Config;
use config::CorsOrigin;
use relay::Relay;
use upstream::UpstreamReqwest;

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .relay(Relay::new(Arc::new(upstream)))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub relay: Relay,
}

/// Installs the process-wide rustls provider. Safe to call more than once.
pub fn install_crypto_provider() {
    // Err means a provider is already installed
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            // Origins carry no path, so `https://bar.ee/` must be sent as `https://bar.ee`
            CorsOrigin::Url(url) => url.origin().ascii_serialization().parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([http::Method::GET, http::Method::PUT])
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_credentials(config.cors.allow_credentials);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Build the application router: relay routes, view routes, health check, CORS and tracing.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    use api::handlers::{relay as relayed, views};

    let backend_routes = Router::new()
        .route(
            "/organizations/{id}",
            get(relayed::get_organization).put(relayed::update_organization),
        )
        .route("/account", get(relayed::get_account))
        .route("/inventory", get(relayed::list_inventory))
        .route("/inventory/sales-stats", get(relayed::get_sales_stats))
        .route("/inventory/station-sales-stats", get(relayed::get_station_sales_stats))
        .route("/categories", get(relayed::list_categories));

    let view_routes = Router::new()
        .route("/dashboard", get(views::get_dashboard))
        .route("/dashboard/organization", put(views::update_organization))
        .route("/products", get(views::get_products))
        .route("/products/live", get(views::stream_products));

    let cors = create_cors_layer(&state.config)?;

    let router = Router::new()
        .nest("/api/backend", backend_routes)
        .nest("/views", view_routes)
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// The assembled service: upstream client, shared state and router.
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting barboard with configuration: {:#?}", config);

        let upstream = UpstreamReqwest::new(&config.upstream)?;
        let state = AppState::builder()
            .config(config.clone())
            .relay(Relay::new(Arc::new(upstream)))
            .build();

        let router = build_router(state)?;

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "barboard listening on http://{}, relaying to {}",
            bind_addr, self.config.upstream.url
        );

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::create_test_app;
    use axum::http::StatusCode;
    use wiremock::MockServer;

    #[tokio::test]
    async fn test_healthz() {
        let server = MockServer::start().await;
        let app = create_test_app(&server).await;

        let response = app.get("/healthz").await;
        response.assert_status_ok();
        response.assert_json(&json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_configured_origin() {
        let server = MockServer::start().await;
        let app = create_test_app(&server).await;

        let response = app
            .method(http::Method::OPTIONS, "/views/dashboard")
            .add_header(http::header::ORIGIN, "http://localhost:3001")
            .add_header(http::header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .await;

        response.assert_status(StatusCode::OK);
        assert_eq!(
            response.header(http::header::ACCESS_CONTROL_ALLOW_ORIGIN),
            "http://localhost:3001"
        );
        assert_eq!(response.header(http::header::ACCESS_CONTROL_ALLOW_CREDENTIALS), "true");
    }

    #[test]
    fn test_cors_origin_drops_trailing_slash() {
        let mut config = Config::default();
        config.cors.allowed_origins = vec![CorsOrigin::Url("https://bar.ee/".parse().unwrap())];
        assert!(create_cors_layer(&config).is_ok());
    }
}
