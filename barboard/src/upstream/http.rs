use async_trait::async_trait;
use axum::http::header;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use super::{TransportError, Upstream, UpstreamRequest, UpstreamResponse};
use crate::config::UpstreamConfig;

/// Forwards calls to the upstream service over HTTP.
pub struct UpstreamReqwest {
    client: Client,
    base_url: Url,
}

impl UpstreamReqwest {
    pub fn new(config: &UpstreamConfig) -> anyhow::Result<Self> {
        crate::install_crypto_provider();

        // No timeout unless one is configured: a hung upstream hangs only its own slice.
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
        })
    }

    fn url_for(&self, request: &UpstreamRequest) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidBaseUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(&request.segments);
        url.set_query(request.query.as_deref().filter(|q| !q.is_empty()));
        Ok(url)
    }
}

#[async_trait]
impl Upstream for UpstreamReqwest {
    #[instrument(skip_all, fields(method = %request.method, path = %request.segments.join("/")))]
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        let url = self.url_for(&request)?;
        debug!("Forwarding request to {}", url);

        let mut outbound = self.client.request(request.method, url);
        if let Some(cookie) = request.cookie {
            outbound = outbound.header(header::COOKIE, cookie);
        }
        if let Some(body) = request.body {
            outbound = outbound.header(header::CONTENT_TYPE, "application/json").body(body);
        }

        let response = outbound.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await?;

        debug!(%status, bytes = body.len(), "Upstream responded");

        Ok(UpstreamResponse { status, content_type, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Method, StatusCode};
    use bytes::Bytes;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn upstream_for(server: &MockServer, base_path: &str) -> UpstreamReqwest {
        let config = UpstreamConfig {
            url: format!("{}{}", server.uri(), base_path).parse().unwrap(),
            request_timeout: None,
        };
        UpstreamReqwest::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_send_builds_url_and_forwards_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/inventory"))
            .and(query_param("categoryId", "3"))
            .and(query_param("organizationId", "2"))
            .and(header("cookie", "jwt=abc; theme=dark"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let upstream = upstream_for(&server, "/api/");
        let response = upstream
            .send(UpstreamRequest {
                method: Method::GET,
                segments: vec!["inventory".to_string()],
                query: Some("categoryId=3&organizationId=2".to_string()),
                cookie: Some(HeaderValue::from_static("jwt=abc; theme=dark")),
                body: None,
            })
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert!(response.is_json());
        assert_eq!(&response.body[..], b"[]");
    }

    #[tokio::test]
    async fn test_send_encodes_path_segments_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/organizations/a%20b"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({"name": "Acme"})))
            .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
            .expect(1)
            .mount(&server)
            .await;

        let upstream = upstream_for(&server, "/api");
        let response = upstream
            .send(UpstreamRequest {
                method: Method::PUT,
                segments: vec!["organizations".to_string(), "a b".to_string()],
                query: None,
                cookie: None,
                body: Some(Bytes::from_static(br#"{"name":"Acme"}"#)),
            })
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert!(!response.is_json());
        assert_eq!(&response.body[..], b"Forbidden");
    }

    #[tokio::test]
    async fn test_send_reports_unreachable_upstream() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = UpstreamConfig {
            url: format!("http://{addr}/api").parse().unwrap(),
            request_timeout: None,
        };
        let upstream = UpstreamReqwest::new(&config).unwrap();
        let result = upstream
            .send(UpstreamRequest {
                method: Method::GET,
                segments: vec!["account".to_string()],
                query: None,
                cookie: None,
                body: None,
            })
            .await;

        assert!(matches!(result, Err(TransportError::Request(_))));
    }
}
