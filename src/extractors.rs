//! Attribution Extractors
//!
//! Axum extractors for per-request client context. Extraction is
//! infallible: a request without tracking headers is an anonymous,
//! consenting visitor.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Per-request client context: the stable client key (if the caller has
/// one yet) and the consent signal.
///
/// Consent is read from the `X-Tracking-Consent` header when present;
/// otherwise a `DNT: 1` header withdraws it. Absent both, consent is
/// granted. Attribution capture itself is consent-independent; the flag
/// gates event recording only.
#[derive(Debug, Clone)]
pub struct ClientContext {
    pub client_id: Option<String>,
    pub consent: bool,
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let client_id = parts
            .headers
            .get("X-Client-Id")
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);

        let consent = match parts
            .headers
            .get("X-Tracking-Consent")
            .and_then(|h| h.to_str().ok())
        {
            Some(value) => !matches!(value.trim().to_lowercase().as_str(), "false" | "0"),
            None => parts
                .headers
                .get("DNT")
                .and_then(|h| h.to_str().ok())
                .map(|v| v.trim() != "1")
                .unwrap_or(true),
        };

        Ok(ClientContext { client_id, consent })
    }
}
