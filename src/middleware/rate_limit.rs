//! Rate limiting middleware
//!
//! Credential endpoints (sign-in, sign-up, password reset) are limited per
//! client IP with a keyed GCRA limiter.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use tracing::warn;

use crate::config::RateLimitConfig;
use crate::state::AppState;
use crate::utils::errors::EventHubError;

type KeyedLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

#[derive(Clone)]
pub struct AuthRateLimiter {
    limiter: Arc<KeyedLimiter>,
}

impl AuthRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let per_minute = NonZeroU32::new(config.auth_requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.auth_burst).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_minute(per_minute).allow_burst(burst);

        Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
        }
    }

    /// Whether `ip` may make another request now
    pub fn check(&self, ip: IpAddr) -> bool {
        self.limiter.check_key(&ip).is_ok()
    }

    /// Forget clients whose quota has fully replenished
    pub fn prune(&self) {
        self.limiter.retain_recent();
    }

    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Reject the request with 429 once the client's quota is used up
pub async fn limit_auth_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, EventHubError> {
    let ip = client_ip(&request);
    if !state.auth_limiter.check(ip) {
        warn!(client_ip = %ip, path = %request.uri().path(), "Auth rate limit exceeded");
        return Err(EventHubError::RateLimitExceeded);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_reject_per_client() {
        let limiter = AuthRateLimiter::new(&RateLimitConfig {
            auth_requests_per_minute: 1,
            auth_burst: 3,
        });
        let first: IpAddr = "10.0.0.1".parse().unwrap();
        let second: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(limiter.check(first));
        assert!(limiter.check(first));
        assert!(limiter.check(first));
        assert!(!limiter.check(first));

        assert!(limiter.check(second));
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_zero_config_still_allows_one() {
        let limiter = AuthRateLimiter::new(&RateLimitConfig {
            auth_requests_per_minute: 0,
            auth_burst: 0,
        });
        let ip: IpAddr = "10.0.0.9".parse().unwrap();
        assert!(limiter.check(ip));
        assert!(!limiter.check(ip));
    }
}
