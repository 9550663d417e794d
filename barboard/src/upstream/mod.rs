//! Client side of the upstream service contract.
//!
//! The [`Upstream`] trait is the single seam through which every outbound call flows: the
//! relay routes and the view aggregators both go through it, so tests can point the whole
//! service at a mock server. [`UpstreamReqwest`] is the production implementation.

mod http;
pub mod listing;

use async_trait::async_trait;
use axum::http::{HeaderValue, Method, StatusCode};
use bytes::Bytes;

pub use http::UpstreamReqwest;
pub use listing::{Listing, ListingShape, normalize};

/// One outbound call. `segments` are unencoded path segments appended to the upstream base URL.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub segments: Vec<String>,
    pub query: Option<String>,
    pub cookie: Option<HeaderValue>,
    pub body: Option<Bytes>,
}

/// Raw upstream response; interpretation is left to the caller.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl UpstreamResponse {
    /// Whether the upstream declared a JSON body.
    pub fn is_json(&self) -> bool {
        self.content_type.as_deref().is_some_and(|ct| ct.contains("application/json"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("upstream base url {0} cannot carry a path")]
    InvalidBaseUrl(url::Url),

    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

#[async_trait]
pub trait Upstream: Send + Sync {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, TransportError>;
}
