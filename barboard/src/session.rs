//! The browser's session credential.
//!
//! The credential is the inbound `Cookie` header. It is never parsed or validated here: the
//! upstream service is the only party that understands it, so it is forwarded byte-for-byte.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderValue, header, request::Parts},
};

/// Opaque session credential taken from the inbound request.
#[derive(Clone, Default)]
pub struct SessionCredential(Option<HeaderValue>);

impl SessionCredential {
    pub fn new(cookie: HeaderValue) -> Self {
        Self(Some(cookie))
    }

    /// Collects the `Cookie` header(s) of a request.
    ///
    /// HTTP/2 clients may split cookies over several header fields; those are joined with `; `
    /// into the single field an HTTP/1.1 upstream expects.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut values = headers.get_all(header::COOKIE).iter();
        let Some(first) = values.next() else {
            return Self(None);
        };

        let rest: Vec<&HeaderValue> = values.collect();
        if rest.is_empty() {
            return Self(Some(first.clone()));
        }

        let mut joined = first.as_bytes().to_vec();
        for value in rest {
            joined.extend_from_slice(b"; ");
            joined.extend_from_slice(value.as_bytes());
        }
        Self(HeaderValue::from_bytes(&joined).ok())
    }

    /// The header value to forward, if the browser sent one.
    pub fn cookie(&self) -> Option<&HeaderValue> {
        self.0.as_ref()
    }
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = if self.0.is_some() { "<redacted>" } else { "<none>" };
        f.debug_tuple("SessionCredential").field(&state).finish()
    }
}

impl<S> FromRequestParts<S> for SessionCredential
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
