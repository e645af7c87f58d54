//! Per-address request throttling.
//!
//! Each scope keeps one token bucket per client IP. Buckets live in a moka
//! cache and disappear after sitting idle, so memory tracks active clients.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use moka::sync::Cache;

use super::response::ApiError;

/// Buckets unused for this long are dropped.
pub const BUCKET_IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Upper bound on tracked addresses per scope.
const MAX_TRACKED_ADDRESSES: u64 = 100_000;

/// Continuously refilling token bucket.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    tokens_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// A full bucket holding `capacity` tokens that regains `capacity`
    /// tokens every `window`.
    #[must_use]
    pub fn new(capacity: u32, window: Duration) -> Self {
        let capacity = f64::from(capacity);
        Self {
            capacity,
            tokens: capacity,
            tokens_per_sec: capacity / window.as_secs_f64(),
            last_refill: Instant::now(),
        }
    }

    /// Take one token if available.
    pub fn try_acquire(&mut self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    fn try_acquire_at(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.tokens_per_sec).min(self.capacity);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// One rate-limit scope: a request budget per minute per client address.
pub struct RateLimiter {
    per_minute: u32,
    buckets: Cache<IpAddr, Arc<Mutex<TokenBucket>>>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("per_minute", &self.per_minute)
            .field("tracked", &self.buckets.entry_count())
            .finish()
    }
}

impl RateLimiter {
    /// Allow `per_minute` requests per minute per address.
    #[must_use]
    pub fn per_minute(per_minute: u32) -> Self {
        Self {
            per_minute,
            buckets: Cache::builder()
                .max_capacity(MAX_TRACKED_ADDRESSES)
                .time_to_idle(BUCKET_IDLE_TIMEOUT)
                .build(),
        }
    }

    /// Record a request from `addr`, returning whether it is allowed.
    pub fn check(&self, addr: IpAddr) -> bool {
        let per_minute = self.per_minute;
        let bucket = self.buckets.get_with(addr, || {
            Arc::new(Mutex::new(TokenBucket::new(
                per_minute,
                Duration::from_secs(60),
            )))
        });

        // A poisoned bucket only means another request panicked mid-update.
        let mut bucket = bucket
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        bucket.try_acquire()
    }
}

/// Middleware rejecting requests over the limit with 429.
///
/// The client address comes from [`ConnectInfo`]; requests without it share
/// the unspecified address's bucket.
pub async fn enforce(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |info| info.0.ip());

    if !limiter.check(addr) {
        tracing::warn!(%addr, path = %request.uri().path(), "rate limit exceeded");
        return ApiError::too_many_requests().into_response();
    }
    next.run(request).await
}
