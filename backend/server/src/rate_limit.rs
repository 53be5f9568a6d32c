//! # Rate Limiting
//!
//! Fixed window counter per client origin, applied to vote submissions only.
//!
//! - Window expired (`now - start > window`): restart at count 1 and allow
//! - Otherwise: bump the count, allow while `count <= max`
//! - Empty origin always passes, this is an abuse brake and not a security boundary
//!
//! ## Known limitation
//! Entries are never evicted. The table grows with the number of distinct origins seen
//! during the process lifetime.
use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

use tracing::warn;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max: 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub count: u32,
    pub start: Instant,
}

/// Pure step of the limiter: previous window for an origin in, decision and next window out.
pub fn advance(config: &RateLimitConfig, prior: Option<Window>, now: Instant) -> (bool, Window) {
    match prior {
        Some(window) if now.saturating_duration_since(window.start) <= config.window => {
            let count = window.count.saturating_add(1);

            (
                count <= config.max,
                Window {
                    count,
                    start: window.start,
                },
            )
        }
        _ => (config.max >= 1, Window { count: 1, start: now }),
    }
}

pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn allow(&self, origin: &str) -> bool {
        self.allow_at(origin, Instant::now())
    }

    pub fn allow_at(&self, origin: &str, now: Instant) -> bool {
        if origin.is_empty() {
            return true;
        }

        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);

        let (allowed, next) = advance(&self.config, windows.get(origin).copied(), now);
        windows.insert(origin.to_string(), next);

        if !allowed {
            warn!(origin, count = next.count, max = self.config.max, "Rate limit exceeded");
        }

        allowed
    }

    #[cfg(test)]
    fn tracked_origins(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
