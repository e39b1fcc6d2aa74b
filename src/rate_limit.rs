// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Attempt limiting for the code exchange endpoint.
//!
//! Limiting is abuse mitigation on top of code entropy, expiry and single
//! use; it is not a security boundary. Counters are process-local and lost
//! on restart. Deployments that need a shared counter implement
//! [`RateLimiter`] over it and hand that to [`AppState`](crate::state::AppState).

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;

use crate::clock::Clock;

/// Default number of attempts per window.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default window length (60 seconds).
pub const DEFAULT_WINDOW_SECS: i64 = 60;

/// Upper bound on tracked client keys. The least recently seen key is
/// dropped first.
const MAX_TRACKED_KEYS: usize = 10_000;

/// Decides whether another attempt from `key` may proceed.
pub trait RateLimiter: Send + Sync {
    fn allow(&self, key: &str) -> bool;

    /// Seconds a rejected caller should wait (`Retry-After`).
    fn retry_after_secs(&self) -> u64 {
        DEFAULT_WINDOW_SECS as u64
    }
}

/// Rate limiter configuration.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Attempts allowed per window (at least 1)
    pub max_attempts: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            window: Duration::seconds(DEFAULT_WINDOW_SECS),
        }
    }
}

struct Window {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// In-memory fixed-window limiter.
pub struct FixedWindowLimiter {
    windows: Mutex<LruCache<String, Window>>,
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
}

impl FixedWindowLimiter {
    pub fn new(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(MAX_TRACKED_KEYS).unwrap_or(NonZeroUsize::MIN);
        Self {
            windows: Mutex::new(LruCache::new(capacity)),
            config: RateLimitConfig {
                max_attempts: config.max_attempts.max(1),
                window: if config.window > Duration::zero() {
                    config.window
                } else {
                    Duration::seconds(DEFAULT_WINDOW_SECS)
                },
            },
            clock,
        }
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn allow(&self, key: &str) -> bool {
        let now = self.clock.now();
        let mut windows = match self.windows.lock() {
            Ok(windows) => windows,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(window) = windows.get_mut(key) {
            if now < window.reset_at {
                if window.count >= self.config.max_attempts {
                    return false;
                }
                window.count += 1;
                return true;
            }
        }

        windows.put(
            key.to_string(),
            Window {
                count: 1,
                reset_at: now + self.config.window,
            },
        );
        true
    }

    fn retry_after_secs(&self) -> u64 {
        self.config.window.num_seconds().max(1) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn limiter() -> (FixedWindowLimiter, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap());
        let limiter = FixedWindowLimiter::new(RateLimitConfig::default(), Arc::new(clock.clone()));
        (limiter, clock)
    }

    #[test]
    fn sixth_attempt_in_window_rejected() {
        let (limiter, clock) = limiter();
        for _ in 0..5 {
            assert!(limiter.allow("10.0.0.1"));
            clock.advance(Duration::seconds(5));
        }
        assert!(!limiter.allow("10.0.0.1"));
    }

    #[test]
    fn window_rollover_resets_counter() {
        let (limiter, clock) = limiter();
        for _ in 0..5 {
            assert!(limiter.allow("10.0.0.1"));
        }
        assert!(!limiter.allow("10.0.0.1"));

        clock.advance(Duration::seconds(DEFAULT_WINDOW_SECS));
        assert!(limiter.allow("10.0.0.1"));
        for _ in 0..4 {
            assert!(limiter.allow("10.0.0.1"));
        }
        assert!(!limiter.allow("10.0.0.1"));
    }

    #[test]
    fn keys_are_independent() {
        let (limiter, _clock) = limiter();
        for _ in 0..5 {
            assert!(limiter.allow("a"));
        }
        assert!(!limiter.allow("a"));
        assert!(limiter.allow("b"));
    }

    #[test]
    fn zero_attempts_clamped_to_one() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap());
        let limiter = FixedWindowLimiter::new(
            RateLimitConfig {
                max_attempts: 0,
                window: Duration::seconds(60),
            },
            Arc::new(clock),
        );
        assert!(limiter.allow("k"));
        assert!(!limiter.allow("k"));
    }

    #[test]
    fn non_positive_window_falls_back_to_default() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap());
        let limiter = FixedWindowLimiter::new(
            RateLimitConfig {
                max_attempts: 2,
                window: Duration::seconds(-5),
            },
            Arc::new(clock),
        );
        assert!(limiter.allow("k"));
        assert!(limiter.allow("k"));
        assert!(!limiter.allow("k"));
        assert_eq!(limiter.retry_after_secs(), 60);
    }
}
