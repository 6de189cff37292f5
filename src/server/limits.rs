//! Per-client request rate limiting

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::RateLimitSettings;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

/// Fixed window request counter
#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

impl Window {
    fn new(now: Instant) -> Self {
        Self { started: now, count: 0 }
    }

    fn roll(&mut self, now: Instant, length: Duration) {
        if now.duration_since(self.started) >= length {
            self.started = now;
            self.count = 0;
        }
    }
}

/// Both windows for one client
#[derive(Debug)]
struct ClientWindows {
    minute: Window,
    hour: Window,
    last_seen: Instant,
}

/// Per-IP limiter enforcing a per-minute and a per-hour budget
#[derive(Debug)]
pub struct RateLimiter {
    clients: RwLock<HashMap<IpAddr, ClientWindows>>,
    settings: RateLimitSettings,
}

impl RateLimiter {
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            settings,
        }
    }

    /// Check if request is allowed, counting it when it is
    pub fn is_allowed(&self, ip: IpAddr) -> bool {
        self.is_allowed_at(ip, Instant::now())
    }

    fn is_allowed_at(&self, ip: IpAddr, now: Instant) -> bool {
        let mut clients = self.clients.write();

        let client = clients.entry(ip).or_insert_with(|| ClientWindows {
            minute: Window::new(now),
            hour: Window::new(now),
            last_seen: now,
        });
        client.last_seen = now;
        client.minute.roll(now, MINUTE);
        client.hour.roll(now, HOUR);

        if client.minute.count >= self.settings.per_minute || client.hour.count >= self.settings.per_hour {
            return false;
        }

        client.minute.count += 1;
        client.hour.count += 1;
        true
    }

    /// Forget clients idle for longer than `max_age`; returns how many were dropped
    pub fn cleanup(&self, max_age: Duration) -> usize {
        let mut clients = self.clients.write();
        let now = Instant::now();
        let before = clients.len();

        clients.retain(|_, client| now.duration_since(client.last_seen) < max_age);

        before - clients.len()
    }

    /// Number of clients currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.clients.read().len()
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    // Get client IP
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if !limiter.is_allowed(ip) {
        tracing::warn!("Rate limit exceeded for {}", ip);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "success": false,
                "error": "Rate limit exceeded",
                "hint": format!(
                    "Limit is {} requests per minute and {} per hour",
                    limiter.settings.per_minute, limiter.settings.per_hour
                ),
            })),
        )
            .into_response();
    }

    next.run(request).await
}
