//! Proxy relay: one inbound call in, one upstream call out.
//!
//! The relay forwards the session credential and re-emits the upstream's status and body
//! without reinterpreting them. A failed update always comes back as text. Only transport failures are replaced, by a fixed
//! `{"error": "Failed to fetch <resource>"}` payload with status 500, so internal detail never
//! reaches the browser. The view aggregators use the same [`Relay::forward`] and interpret the
//! resulting [`RelayResponse`] themselves.

use std::sync::Arc;

use axum::{
    Json,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde_json::{Value, json};
use tracing::{error, instrument};

use crate::session::SessionCredential;
use crate::upstream::{Upstream, UpstreamRequest};

/// Upstream resources reachable through the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Organization(String),
    Account,
    SalesStats,
    StationSalesStats,
    Categories,
    Inventory,
}

impl Resource {
    fn segments(&self) -> Vec<String> {
        let segments: &[&str] = match self {
            Resource::Organization(id) => return vec!["organizations".to_string(), id.clone()],
            Resource::Account => &["account"],
            Resource::SalesStats => &["inventory", "sales-stats"],
            Resource::StationSalesStats => &["inventory", "station-sales-stats"],
            Resource::Categories => &["categories"],
            Resource::Inventory => &["inventory"],
        };
        segments.iter().map(|s| s.to_string()).collect()
    }

    /// Name used in logs and in the generic transport failure message.
    pub fn label(&self) -> &'static str {
        match self {
            Resource::Organization(_) => "organization",
            Resource::Account => "account",
            Resource::SalesStats => "sales stats",
            Resource::StationSalesStats => "station sales stats",
            Resource::Categories => "categories",
            Resource::Inventory => "inventory",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub method: Method,
    pub resource: Resource,
    pub query: Option<String>,
    pub credential: SessionCredential,
    pub body: Option<Bytes>,
}

impl RelayRequest {
    pub fn get(resource: Resource, credential: &SessionCredential) -> Self {
        Self {
            method: Method::GET,
            resource,
            query: None,
            credential: credential.clone(),
            body: None,
        }
    }

    pub fn put(resource: Resource, credential: &SessionCredential, body: Bytes) -> Self {
        Self {
            method: Method::PUT,
            body: Some(body),
            ..Self::get(resource, credential)
        }
    }

    pub fn with_query(mut self, query: Option<String>) -> Self {
        self.query = query;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RelayBody {
    Json(Value),
    Text(String),
}

/// What the relay re-emits for one call.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayResponse {
    /// The upstream answered; status and body are passed through.
    Upstream { status: StatusCode, body: RelayBody },
    /// The upstream could not be reached or its answer could not be read.
    TransportFailure { resource: &'static str },
}

impl RelayResponse {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayResponse::Upstream { status, .. } => *status,
            RelayResponse::TransportFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayResponse {
    fn into_response(self) -> Response {
        match self {
            RelayResponse::Upstream {
                status,
                body: RelayBody::Json(value),
            } => (status, Json(value)).into_response(),
            RelayResponse::Upstream {
                status,
                body: RelayBody::Text(text),
            } => (status, text).into_response(),
            RelayResponse::TransportFailure { resource } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("Failed to fetch {resource}") })),
            )
                .into_response(),
        }
    }
}

/// Stateless relay over an [`Upstream`]. Cheap to clone.
#[derive(Clone)]
pub struct Relay {
    upstream: Arc<dyn Upstream>,
}

impl Relay {
    pub fn new(upstream: Arc<dyn Upstream>) -> Self {
        Self { upstream }
    }

    /// Forward one request upstream. Never retries.
    #[instrument(skip_all, fields(resource = request.resource.label(), method = %request.method))]
    pub async fn forward(&self, request: RelayRequest) -> RelayResponse {
        let resource = request.resource.label();
        let method = request.method;
        let outbound = UpstreamRequest {
            method: method.clone(),
            segments: request.resource.segments(),
            query: request.query,
            cookie: request.credential.cookie().cloned(),
            body: request.body,
        };

        let response = match self.upstream.send(outbound).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Proxy error ({resource})");
                return RelayResponse::TransportFailure { resource };
            }
        };

        let status = response.status;
        if !status.is_success() && (method == Method::PUT || !response.is_json()) {
            let text = String::from_utf8_lossy(&response.body).into_owned();
            return RelayResponse::Upstream {
                status,
                body: RelayBody::Text(text),
            };
        }

        match serde_json::from_slice::<Value>(&response.body) {
            Ok(value) => RelayResponse::Upstream {
                status,
                body: RelayBody::Json(value),
            },
            Err(e) => {
                error!(%status, error = %e, "Proxy error ({resource}): upstream body is not valid JSON");
                RelayResponse::TransportFailure { resource }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::relay_for;
    use axum::http::HeaderValue;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credential() -> SessionCredential {
        SessionCredential::new(HeaderValue::from_static("jwt=token"))
    }

    #[tokio::test]
    async fn test_success_is_decoded_with_same_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/organizations/5"))
            .and(header("cookie", "jwt=token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 5, "name": "Acme"})))
            .mount(&server)
            .await;

        let response = relay_for(&server)
            .forward(RelayRequest::get(Resource::Organization("5".into()), &credential()))
            .await;

        assert_eq!(
            response,
            RelayResponse::Upstream {
                status: StatusCode::OK,
                body: RelayBody::Json(json!({"id": 5, "name": "Acme"})),
            }
        );
    }

    #[tokio::test]
    async fn test_json_error_passes_through_verbatim() {
        let server = MockServer::start().await;
        let error_body = json!({"status": 404, "message": "Organization not found: 9"});
        Mock::given(method("GET"))
            .and(path("/api/organizations/9"))
            .respond_with(ResponseTemplate::new(404).set_body_json(error_body.clone()))
            .mount(&server)
            .await;

        let response = relay_for(&server)
            .forward(RelayRequest::get(Resource::Organization("9".into()), &credential()))
            .await;

        assert_eq!(
            response,
            RelayResponse::Upstream {
                status: StatusCode::NOT_FOUND,
                body: RelayBody::Json(error_body),
            }
        );
    }

    #[tokio::test]
    async fn test_text_error_passes_through_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/organizations/5"))
            .and(body_string(r#"{"name":"New"}"#))
            .respond_with(ResponseTemplate::new(403).set_body_string("Access Denied"))
            .mount(&server)
            .await;

        let response = relay_for(&server)
            .forward(RelayRequest::put(
                Resource::Organization("5".into()),
                &credential(),
                Bytes::from_static(br#"{"name":"New"}"#),
            ))
            .await;

        assert_eq!(
            response,
            RelayResponse::Upstream {
                status: StatusCode::FORBIDDEN,
                body: RelayBody::Text("Access Denied".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_update_error_is_text_whatever_its_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/organizations/5"))
            .respond_with(ResponseTemplate::new(400).set_body_raw("Name must not be blank", "application/json"))
            .mount(&server)
            .await;

        let response = relay_for(&server)
            .forward(RelayRequest::put(
                Resource::Organization("5".into()),
                &credential(),
                Bytes::from_static(br#"{"name":""}"#),
            ))
            .await;

        assert_eq!(
            response,
            RelayResponse::Upstream {
                status: StatusCode::BAD_REQUEST,
                body: RelayBody::Text("Name must not be blank".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_undecodable_success_is_a_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/account"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html>", "application/json"))
            .mount(&server)
            .await;

        let response = relay_for(&server).forward(RelayRequest::get(Resource::Account, &credential())).await;

        assert_eq!(response, RelayResponse::TransportFailure { resource: "account" });
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_a_transport_failure() {
        let relay = crate::test_utils::unreachable_relay();

        let response = relay
            .forward(RelayRequest::get(Resource::StationSalesStats, &credential()))
            .await;

        assert_eq!(
            response,
            RelayResponse::TransportFailure {
                resource: "station sales stats"
            }
        );
    }
}
