/// Request rate limiting
use crate::{
    error::{RegistryError, RegistryResult},
    metrics,
};
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc, time::Duration, time::Instant};

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Sustained requests per second
    pub requests_per_second: u32,
    /// Burst size
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 20,
            burst_size: 40,
        }
    }
}

/// Process-wide limiter shared by every route
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        // Validated config never carries zeros
        let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst_size).unwrap_or(rps);

        Self {
            limiter: Arc::new(GovernorLimiter::direct(Quota::per_second(rps).allow_burst(burst))),
        }
    }

    /// Take one request slot
    pub fn check(&self) -> RegistryResult<()> {
        match self.limiter.check() {
            Ok(_) => Ok(()),
            Err(_) => Err(RegistryError::RateLimitExceeded {
                retry_after: Duration::from_secs(1),
            }),
        }
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<crate::context::AppContext>,
    request: Request,
    next: Next,
) -> Response {
    match ctx.rate_limiter.check() {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

/// Count and time every request
pub async fn track_http_metrics(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    // Matched route template keeps label cardinality bounded
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let started = Instant::now();

    let response = next.run(request).await;

    metrics::record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}
