//! Rate limiting per IP - finestre fisse in una DashMap
//!
//! Protects the public invite endpoints from brute force independently of the
//! per-invite counters.

use crate::core::AppError;
use axum::extract::{ConnectInfo, State};
use axum::{body::Body, extract::Request, http::Response, middleware::Next};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Oltre questa soglia le finestre scadute vengono ripulite
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitConfig {
    pub const fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Limited { retry_after_seconds: u64 },
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window counter per client key
pub struct IpRateLimiter {
    config: RateLimitConfig,
    windows: DashMap<String, Window>,
}

impl IpRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
        }
    }

    /// Counts one request for `key` at `now`
    pub fn try_acquire(&self, key: &str, now: Instant) -> Admission {
        if self.windows.len() > PRUNE_THRESHOLD {
            let window = self.config.window;
            self.windows
                .retain(|_, w| now.saturating_duration_since(w.started) < window);
        }

        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.saturating_duration_since(entry.started) >= self.config.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.config.max_requests {
            let elapsed = now.saturating_duration_since(entry.started);
            let remaining = self.config.window.saturating_sub(elapsed);
            return Admission::Limited {
                retry_after_seconds: remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0),
            };
        }

        entry.count += 1;
        Admission::Allowed
    }
}

/// Limiters of the public invite endpoints
pub struct RequestLimits {
    pub send_code: Arc<IpRateLimiter>,
    pub verify_code: Arc<IpRateLimiter>,
    pub accept: Arc<IpRateLimiter>,
}

impl Default for RequestLimits {
    /// 10 send / 10 verify / 5 accept ogni 15 minuti per IP
    fn default() -> Self {
        let window = Duration::from_secs(15 * 60);
        Self {
            send_code: Arc::new(IpRateLimiter::new(RateLimitConfig::new(10, window))),
            verify_code: Arc::new(IpRateLimiter::new(RateLimitConfig::new(10, window))),
            accept: Arc::new(IpRateLimiter::new(RateLimitConfig::new(5, window))),
        }
    }
}

/// Primo hop di X-Forwarded-For, altrimenti l'indirizzo della socket
pub fn client_key(req: &Request) -> String {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<IpRateLimiter>>,
    req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    let key = client_key(&req);
    match limiter.try_acquire(&key, Instant::now()) {
        Admission::Allowed => {
            debug!("Request from {} admitted", key);
            Ok(next.run(req).await)
        }
        Admission::Limited {
            retry_after_seconds,
        } => {
            warn!("Too many requests from {} on {}", key, req.uri().path());
            Err(AppError::too_many_requests("Too many requests, please try again later")
                .with_code("RATE_LIMIT_EXCEEDED")
                .with_retry_after(retry_after_seconds as i64))
        }
    }
}
