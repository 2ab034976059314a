//! Request budget for the AI backend
//!
//! Rolling per-minute and per-day windows. The limiter is an explicit
//! object built once from settings and shared by the classifier and the
//! chat fallback; it never lives in process-wide state.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

use shadow_config::RateLimitConfig;

use crate::LlmError;

const MINUTE: Duration = Duration::from_secs(60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Requests counted in the current windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitUsage {
    pub minute: u32,
    pub minute_limit: u32,
    pub day: u32,
    pub day_limit: u32,
}

impl RateLimitUsage {
    pub fn is_exhausted(&self) -> bool {
        self.minute >= self.minute_limit || self.day >= self.day_limit
    }
}

#[derive(Debug, Default)]
struct Windows {
    minute: VecDeque<Instant>,
    day: VecDeque<Instant>,
}

impl Windows {
    fn prune(&mut self, now: Instant) {
        while self.minute.front().is_some_and(|t| now.duration_since(*t) >= MINUTE) {
            self.minute.pop_front();
        }
        while self.day.front().is_some_and(|t| now.duration_since(*t) >= DAY) {
            self.day.pop_front();
        }
    }
}

/// Thread-safe rolling-window rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    limits: RateLimitConfig,
    windows: Mutex<Windows>,
}

impl RateLimiter {
    /// Create a limiter with the given budgets
    pub fn init(limits: RateLimitConfig) -> Self {
        Self {
            limits,
            windows: Mutex::new(Windows::default()),
        }
    }

    /// Check the budget and count one request if it fits
    ///
    /// Check and increment happen under one lock, so concurrent callers
    /// can never overshoot a budget.
    pub fn try_acquire(&self) -> Result<(), LlmError> {
        self.try_acquire_at(Instant::now())
    }

    pub(crate) fn try_acquire_at(&self, now: Instant) -> Result<(), LlmError> {
        let mut windows = self.windows.lock();
        windows.prune(now);

        if windows.minute.len() as u32 >= self.limits.requests_per_minute {
            tracing::warn!(limit = self.limits.requests_per_minute, "Per-minute AI budget exhausted");
            metrics::counter!("shadow_ai_requests_total", "outcome" => "rate_limited").increment(1);
            return Err(LlmError::RateLimited(format!(
                "{} requests per minute",
                self.limits.requests_per_minute
            )));
        }
        if windows.day.len() as u32 >= self.limits.requests_per_day {
            tracing::warn!(limit = self.limits.requests_per_day, "Daily AI budget exhausted");
            metrics::counter!("shadow_ai_requests_total", "outcome" => "rate_limited").increment(1);
            return Err(LlmError::RateLimited(format!(
                "{} requests per day",
                self.limits.requests_per_day
            )));
        }

        windows.minute.push_back(now);
        windows.day.push_back(now);
        Ok(())
    }

    /// Current window counts
    pub fn usage(&self) -> RateLimitUsage {
        self.usage_at(Instant::now())
    }

    pub(crate) fn usage_at(&self, now: Instant) -> RateLimitUsage {
        let mut windows = self.windows.lock();
        windows.prune(now);
        RateLimitUsage {
            minute: windows.minute.len() as u32,
            minute_limit: self.limits.requests_per_minute,
            day: windows.day.len() as u32,
            day_limit: self.limits.requests_per_day,
        }
    }

    pub fn limits(&self) -> RateLimitConfig {
        self.limits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn limiter(per_minute: u32, per_day: u32) -> RateLimiter {
        RateLimiter::init(RateLimitConfig {
            requests_per_minute: per_minute,
            requests_per_day: per_day,
        })
    }

    #[test]
    fn test_minute_budget() {
        let limiter = limiter(2, 100);
        let start = Instant::now();

        assert!(limiter.try_acquire_at(start).is_ok());
        assert!(limiter.try_acquire_at(start).is_ok());
        assert!(matches!(
            limiter.try_acquire_at(start),
            Err(LlmError::RateLimited(_))
        ));

        // Window rolls over
        assert!(limiter.try_acquire_at(start + Duration::from_secs(61)).is_ok());
    }

    #[test]
    fn test_day_budget_outlives_minute_window() {
        let limiter = limiter(10, 3);
        let start = Instant::now();

        for i in 0..3 {
            assert!(limiter
                .try_acquire_at(start + Duration::from_secs(i * 120))
                .is_ok());
        }
        assert!(limiter
            .try_acquire_at(start + Duration::from_secs(600))
            .is_err());
        assert!(limiter.try_acquire_at(start + DAY + Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn test_rejected_requests_are_not_counted() {
        let limiter = limiter(1, 100);
        let start = Instant::now();
        limiter.try_acquire_at(start).unwrap();
        let _ = limiter.try_acquire_at(start);
        let _ = limiter.try_acquire_at(start);

        let usage = limiter.usage_at(start);
        assert_eq!(usage.minute, 1);
        assert_eq!(usage.day, 1);
        assert!(usage.is_exhausted());
    }

    #[test]
    fn test_concurrent_acquire_never_overshoots() {
        let limiter = Arc::new(limiter(50, 1000));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || (0..20).filter(|_| limiter.try_acquire().is_ok()).count())
            })
            .collect();

        let granted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(granted, 50);
        assert_eq!(limiter.usage().minute, 50);
    }
}
