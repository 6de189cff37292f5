//! `X-API-Key` authentication

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::net::SocketAddr;
use std::sync::Arc;

pub const API_KEY_HEADER: &str = "x-api-key";

/// The key protected routes expect; `None` leaves them open
#[derive(Debug, Clone)]
pub struct ApiKey(Option<Arc<str>>);

impl ApiKey {
    pub fn new(key: Option<String>) -> Self {
        Self(key.filter(|k| !k.trim().is_empty()).map(Arc::from))
    }

    pub fn is_configured(&self) -> bool {
        self.0.is_some()
    }

    /// Check a provided header value against the configured key
    pub fn accepts(&self, provided: Option<&str>) -> bool {
        match (&self.0, provided) {
            (None, _) => true,
            (Some(expected), Some(provided)) => constant_time_eq(expected.as_bytes(), provided.as_bytes()),
            (Some(_), None) => false,
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Reject requests without the configured API key
pub async fn require_api_key(
    State(key): State<ApiKey>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if !key.accepts(provided) {
        let remote = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        tracing::warn!("Unauthorized request attempt from {}", remote);

        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "success": false,
                "error": "Unauthorized - invalid or missing API key",
            })),
        )
            .into_response();
    }

    next.run(request).await
}
