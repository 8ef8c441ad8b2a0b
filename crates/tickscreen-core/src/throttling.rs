use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Request budget for one upstream: `quota_limit` calls per `quota_window`.
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottlePolicy {
    pub quota_window: Duration,
    pub quota_limit: u32,
}

impl ThrottlePolicy {
    /// Conservative budget for the unofficial Yahoo chart endpoint.
    pub fn yahoo_default() -> Self {
        Self {
            quota_window: Duration::from_secs(60),
            quota_limit: 60,
        }
    }
}

/// Shared rate limiter gating every upstream call of a provider.
///
/// Workers that exceed the budget wait for the next cell instead of failing,
/// so a wide fan-out degrades into a slower run rather than a burst of 429s.
#[derive(Clone)]
pub struct RequestThrottle {
    limiter: Arc<DirectRateLimiter>,
}

impl RequestThrottle {
    pub fn new(policy: &ThrottlePolicy) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::direct(quota_from_window(
                policy.quota_window,
                policy.quota_limit,
            ))),
        }
    }

    /// Returns immediately when budget is available.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Waits until budget is available.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }
}

impl std::fmt::Debug for RequestThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestThrottle").finish_non_exhaustive()
    }
}

fn quota_from_window(quota_window: Duration, quota_limit: u32) -> Quota {
    let burst = NonZeroU32::new(quota_limit.max(1)).unwrap_or(NonZeroU32::MIN);
    let seconds_per_cell = (quota_window.as_secs_f64() / f64::from(burst.get())).max(0.001);

    Quota::with_period(Duration::from_secs_f64(seconds_per_cell))
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}
