// Rate Limiting Module using a simple in-memory fixed window.
// One limiter instance is built per process and handed to the handlers
// through application state; nothing here is global.

use config_rs::RateLimitSettings;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

// Per-identifier rate limit tracking
#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    count: u32,
    reset_at: Instant,
}

/// Result of a single `check_and_consume` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: Instant,
}

impl RateLimitDecision {
    /// Time left until the window resets, measured from `now`.
    pub fn retry_after(&self, now: Instant) -> Duration {
        self.reset_at.saturating_duration_since(now)
    }
}

/// Fixed-window request counter keyed by caller identifier.
///
/// Bursts of up to twice the limit are possible across a window boundary.
/// Entries are never evicted; each one is two words and refreshes in place.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    entries: Mutex<HashMap<String, RateLimitEntry>>,
}

impl RateLimiter {
    pub fn new(settings: &RateLimitSettings) -> Self {
        Self {
            max_requests: settings.max_requests,
            window: settings.window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub async fn check_and_consume(&self, identifier: &str) -> RateLimitDecision {
        self.check_and_consume_at(identifier, Instant::now()).await
    }

    /// Same as `check_and_consume` with an explicit clock reading.
    /// The lookup and update happen under one lock acquisition.
    pub async fn check_and_consume_at(&self, identifier: &str, now: Instant) -> RateLimitDecision {
        let mut map = self.entries.lock().await;

        if let Some(entry) = map.get_mut(identifier) {
            if entry.reset_at > now {
                if entry.count >= self.max_requests {
                    return RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                        reset_at: entry.reset_at,
                    };
                }

                entry.count += 1;
                return RateLimitDecision {
                    allowed: true,
                    remaining: self.max_requests - entry.count,
                    reset_at: entry.reset_at,
                };
            }
        }

        // No entry yet, or the window expired
        let reset_at = now + self.window;
        map.insert(identifier.to_string(), RateLimitEntry { count: 1, reset_at });
        RateLimitDecision {
            allowed: self.max_requests > 0,
            remaining: self.max_requests.saturating_sub(1),
            reset_at,
        }
    }

    /// Number of identifiers currently tracked
    pub async fn tracked_identifiers(&self) -> usize {
        self.entries.lock().await.len()
    }
}
