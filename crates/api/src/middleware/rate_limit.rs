use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use moka::future::Cache;
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};
use tracing::{debug, warn};

use crate::models::ErrorResponse;

pub const RATE_LIMIT_EXCEEDED: &str = "Too many requests, please try again later.";
const RATE_LIMIT_CACHE_MAX_CAPACITY: u64 = 50_000;

#[derive(Debug)]
struct Counter(AtomicU32);

impl Counter {
    fn new(value: u32) -> Self {
        Self(AtomicU32::new(value))
    }

    fn increment(&self) -> u32 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Fixed-window request counters keyed by client address.
///
/// A client's window opens with its first request and the counter entry expires
/// `window` later; increments never refresh the entry.
#[derive(Clone)]
pub struct RateLimitState {
    client_limits: Arc<Cache<String, Arc<Counter>>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimitState {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let client_limits: Cache<String, Arc<Counter>> = Cache::builder()
            .time_to_live(window)
            .max_capacity(RATE_LIMIT_CACHE_MAX_CAPACITY)
            .build();

        Self {
            client_limits: Arc::new(client_limits),
            max_requests,
            window,
        }
    }

    pub fn from_config(config: &config::RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    async fn check_limit(&self, client: &str) -> (bool, u32, u32) {
        let counter = self
            .client_limits
            .get_with(client.to_string(), async { Arc::new(Counter::new(0)) })
            .await;

        let count = counter.increment();
        let allowed = count <= self.max_requests;

        (allowed, count, self.max_requests)
    }
}

/// First `X-Forwarded-For` hop, else the peer address, else `"unknown"`
fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    match (forwarded, peer) {
        (Some(ip), _) => ip.to_string(),
        (None, Some(addr)) => addr.ip().to_string(),
        (None, None) => "unknown".to_string(),
    }
}

pub async fn client_rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, axum::Json<ErrorResponse>)> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(request.headers(), peer);

    let (allowed, count, limit) = state.check_limit(&client).await;

    if !allowed {
        warn!(
            client = %client,
            count,
            limit,
            path = %request.uri().path(),
            "Client rate limit exceeded"
        );
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            axum::Json(ErrorResponse::new(
                RATE_LIMIT_EXCEEDED,
                format!(
                    "Rate limit of {limit} requests per {} seconds exceeded",
                    state.window.as_secs()
                ),
            )),
        ));
    }

    debug!("Rate limit check passed for {}: {}/{}", client, count, limit);

    Ok(next.run(request).await)
}
