//! Global concurrency cap plus minimum-interval pacing (spec §4.3).
//!
//! The concurrency bound is a plain counting semaphore; the minimum
//! wall-clock spacing between request *starts* is delegated to
//! `governor`'s single-cell rate limiter, which is exactly the "one
//! event per period" primitive the spec describes.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};

pub struct Throttle {
    semaphore: Semaphore,
    min_interval: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl Throttle {
    pub fn new(max_concurrency: usize, min_interval_secs: f64) -> Self {
        let period = Duration::from_secs_f64(min_interval_secs.max(0.001));
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::new(1).unwrap()));
        Self {
            semaphore: Semaphore::new(max_concurrency.max(1)),
            min_interval: RateLimiter::direct(quota),
        }
    }

    /// Awaits both suspension points in order: semaphore acquisition,
    /// then the min-interval wait (spec §4.3, §5).
    pub async fn acquire(&self) -> SemaphorePermit<'_> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .expect("fetch semaphore never closes");
        self.min_interval.until_ready().await;
        permit
    }
}

pub type SharedThrottle = Arc<Throttle>;
