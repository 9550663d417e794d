//! Test utilities: apps and relays wired to a wiremock upstream.

use std::sync::Arc;

use axum_test::TestServer;
use wiremock::MockServer;

use crate::config::{Config, UpstreamConfig};
use crate::relay::Relay;
use crate::upstream::UpstreamReqwest;

pub async fn create_test_app(server: &MockServer) -> TestServer {
    create_test_app_with_config(create_test_config(server)).await
}

pub async fn create_test_app_with_config(config: Config) -> TestServer {
    let app = crate::Application::new(config)
        .await
        .expect("Failed to create application");

    app.into_test_server()
}

/// Default config with the upstream pointed at `server` and the board on organization 2.
pub fn create_test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.upstream = upstream_config(&format!("{}/api", server.uri()));
    config.product_board.organization_id = Some(2);
    config
}

fn upstream_config(url: &str) -> UpstreamConfig {
    UpstreamConfig {
        url: url.parse().expect("test upstream url is valid"),
        request_timeout: None,
    }
}

pub fn relay_for(server: &MockServer) -> Relay {
    let upstream = UpstreamReqwest::new(&upstream_config(&format!("{}/api", server.uri()))).expect("Failed to create upstream client");
    Relay::new(Arc::new(upstream))
}

/// A relay whose upstream refuses connections.
pub fn unreachable_relay() -> Relay {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind probe port");
    let addr = listener.local_addr().expect("Failed to read probe port");
    drop(listener);

    let upstream = UpstreamReqwest::new(&upstream_config(&format!("http://{addr}/api"))).expect("Failed to create upstream client");
    Relay::new(Arc::new(upstream))
}
