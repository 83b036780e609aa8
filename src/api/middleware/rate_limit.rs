use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroU32,
    sync::atomic::{AtomicU64, Ordering},
};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::keyed::DashMapStateStore,
    Quota, RateLimiter,
};

use crate::error::AppError;
use crate::AppState;

type KeyedLimiter = RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock>;

/// Idle buckets are swept once every this many checks.
const SWEEP_EVERY: u64 = 4096;

/// Token bucket per client address.
pub struct IpRateLimiter {
    limiter: KeyedLimiter,
    checks: AtomicU64,
}

impl IpRateLimiter {
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN))
            .allow_burst(NonZeroU32::new(burst_size).unwrap_or(NonZeroU32::MIN));

        Self {
            limiter: RateLimiter::dashmap(quota),
            checks: AtomicU64::new(0),
        }
    }

    pub fn check(&self, ip: IpAddr) -> bool {
        if self.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.evict_idle();
        }

        self.limiter.check_key(&ip).is_ok()
    }

    /// Drop buckets that have refilled completely; they hold no state a
    /// fresh bucket would not.
    pub fn evict_idle(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

/// Bucket key for a storefront request.
///
/// Behind the production proxy this is the rightmost `X-Forwarded-For` hop,
/// the one the proxy itself appended. Everything left of it is whatever the
/// client sent. Elsewhere only the socket peer counts.
pub fn rate_limit_key(headers: &HeaderMap, peer: Option<IpAddr>, behind_proxy: bool) -> IpAddr {
    let forwarded: Option<IpAddr> = behind_proxy
        .then(|| {
            headers
                .get("X-Forwarded-For")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.rsplit(',').next())
                .and_then(|last| last.trim().parse().ok())
        })
        .flatten();

    forwarded
        .or(peer)
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Rate limiting middleware for storefront-facing routes. Clients whose
/// address cannot be determined share one bucket.
pub async fn rate_limit_by_ip(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let ip = rate_limit_key(
        request.headers(),
        peer.map(|ConnectInfo(addr)| addr.ip()),
        state.config.environment.is_production(),
    );

    if !state.rate_limiter.check(ip) {
        tracing::warn!(
            client_ip = %ip,
            path = %request.uri().path(),
            "Rate limit exceeded"
        );
        return Err(AppError::RateLimitExceeded);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::time::Duration;

    #[test]
    fn test_burst_is_enforced_per_ip() {
        let limiter = IpRateLimiter::new(1, 2);
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(limiter.check(a));
        assert!(limiter.check(a));
        assert!(!limiter.check(a));

        assert!(limiter.check(b));
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_zero_settings_fall_back_to_one() {
        let limiter = IpRateLimiter::new(0, 0);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();

        assert!(limiter.check(ip));
        assert!(!limiter.check(ip));
    }

    #[test]
    fn test_refilled_buckets_are_evicted() {
        let limiter = IpRateLimiter::new(1000, 1);
        for last in 1..=50u8 {
            limiter.check(IpAddr::V4(Ipv4Addr::new(10, 0, 0, last)));
        }
        assert_eq!(limiter.tracked_clients(), 50);

        std::thread::sleep(Duration::from_millis(100));
        limiter.evict_idle();

        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn test_key_ignores_client_supplied_hops() {
        let peer: Option<IpAddr> = Some("10.1.1.1".parse().unwrap());
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Forwarded-For",
            HeaderValue::from_static("6.6.6.6, 203.0.113.9"),
        );

        assert_eq!(
            rate_limit_key(&headers, peer, true),
            "203.0.113.9".parse::<IpAddr>().unwrap()
        );
        assert_eq!(rate_limit_key(&headers, peer, false), peer.unwrap());
        assert_eq!(
            rate_limit_key(&HeaderMap::new(), None, false),
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        );
    }
}
