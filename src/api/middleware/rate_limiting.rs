use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use serde::Serialize;
use std::{
    collections::VecDeque,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, warn};

/// Rate limiting configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window for one client IP
    pub requests_per_window: u32,
    /// Rate limit window duration in seconds
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 60,
            window_seconds: 60,
        }
    }
}

/// Rate limiting middleware response
#[derive(Serialize)]
struct RateLimitResponse {
    error: String,
    retry_after: u64,
}

/// Rate limit error types
#[derive(Debug, PartialEq, Eq)]
pub enum RateLimitError {
    LimitExceeded(u64), // seconds to wait
}

/// Sliding-window limiter keyed by client IP
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: Arc<RateLimitConfig>,
    clients: Arc<DashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config: Arc::new(config),
            clients: Arc::new(DashMap::new()),
        }
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.config.window_seconds)
    }

    /// Check if a request should be rate limited
    pub fn check_limit(&self, key: &str) -> Result<(), RateLimitError> {
        self.check_limit_at(key, Instant::now())
    }

    fn check_limit_at(&self, key: &str, now: Instant) -> Result<(), RateLimitError> {
        let window = self.window();
        let mut requests = self.clients.entry(key.to_string()).or_default();

        // Remove old requests outside the window
        while let Some(&oldest) = requests.front() {
            if now.duration_since(oldest) >= window {
                requests.pop_front();
            } else {
                break;
            }
        }

        if requests.len() >= self.config.requests_per_window as usize {
            let retry_after = requests
                .front()
                .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(window);
            // Round up so a client never retries before the window opens
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            return Err(RateLimitError::LimitExceeded(secs.max(1)));
        }

        requests.push_back(now);
        Ok(())
    }

    /// Clean up idle clients to prevent memory leaks
    pub fn cleanup(&self) {
        let window = self.window();
        let now = Instant::now();
        self.clients.retain(|_, requests| {
            requests
                .back()
                .is_some_and(|latest| now.duration_since(*latest) < window)
        });
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }

    /// Periodically drop idle clients
    pub fn spawn_cleanup(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                limiter.cleanup();
                debug!(clients = limiter.tracked_clients(), "Rate limiter cleaned up");
            }
        })
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = extract_ip_address(&request);

    match limiter.check_limit(&client) {
        Ok(()) => next.run(request).await,
        Err(RateLimitError::LimitExceeded(retry_after)) => {
            warn!(client = %client, retry_after, "Rate limit exceeded");
            let body = RateLimitResponse {
                error: "Rate limit exceeded".to_string(),
                retry_after,
            };

            (
                StatusCode::TOO_MANY_REQUESTS,
                [("Retry-After", retry_after.to_string())],
                axum::Json(body),
            )
                .into_response()
        }
    }
}

/// Extract IP address from request
fn extract_ip_address(request: &Request) -> String {
    // Try X-Forwarded-For header first (for proxies/load balancers)
    if let Some(forwarded_for) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
    {
        // Take the first IP in case of multiple
        if let Some(first_ip) = forwarded_for.split(',').next() {
            if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                return ip.to_string();
            }
        }
    }

    if let Some(real_ip) = request
        .headers()
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|ip| ip.trim().parse::<IpAddr>().ok())
    {
        return real_ip.to_string();
    }

    // Set by `into_make_service_with_connect_info`
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn limiter(requests_per_window: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            requests_per_window,
            window_seconds: 60,
        })
    }

    #[test]
    fn test_rate_limiter_within_limit() {
        let limiter = limiter(5);
        for _ in 0..5 {
            assert!(limiter.check_limit("10.0.0.1").is_ok());
        }
    }

    #[test]
    fn test_rate_limiter_exceeds_limit_per_client() {
        let limiter = limiter(3);
        for _ in 0..3 {
            assert!(limiter.check_limit("10.0.0.1").is_ok());
        }

        match limiter.check_limit("10.0.0.1") {
            Err(RateLimitError::LimitExceeded(retry_after)) => {
                assert!(retry_after > 0 && retry_after <= 60);
            }
            other => panic!("expected rate limit, got {:?}", other),
        }
        assert!(limiter.check_limit("10.0.0.2").is_ok());
    }

    #[test]
    fn test_window_slides() {
        let limiter = limiter(1);
        let start = Instant::now();

        assert!(limiter.check_limit_at("ip", start).is_ok());
        assert!(limiter
            .check_limit_at("ip", start + Duration::from_secs(30))
            .is_err());
        assert!(limiter
            .check_limit_at("ip", start + Duration::from_secs(61))
            .is_ok());
    }

    #[test]
    fn test_cleanup_keeps_active_clients() {
        let limiter = limiter(10);
        limiter.check_limit("a").unwrap();
        limiter.check_limit("b").unwrap();

        limiter.cleanup();

        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_extract_ip_address() {
        let request = axum::http::Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_ip_address(&request), "203.0.113.7");

        let request = axum::http::Request::builder()
            .header("x-real-ip", "198.51.100.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_ip_address(&request), "198.51.100.2");

        assert_eq!(extract_ip_address(&Request::default()), "unknown");
    }

    #[tokio::test]
    async fn test_middleware_returns_429_with_retry_after() {
        let limiter = Arc::new(limiter(1));
        let app = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));

        let request = || {
            axum::http::Request::builder()
                .uri("/ping")
                .header("x-real-ip", "192.0.2.1")
                .body(Body::empty())
                .unwrap()
        };

        let first = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.oneshot(request()).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(second.headers().contains_key("retry-after"));
    }
}
