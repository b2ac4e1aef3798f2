//! Sign-in rate limiting
//!
//! Fixed-window attempt counter per normalized email.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::AppError;

const DEFAULT_MAX_TRACKED_KEYS: usize = 10_000;

/// Rate limiter entry
#[derive(Debug, Clone)]
struct RateLimitEntry {
    /// Number of attempts in current window
    count: u32,
    /// Window start time
    window_start: Instant,
}

impl RateLimitEntry {
    fn is_new_window(&self, window_duration: Duration) -> bool {
        self.window_start.elapsed() >= window_duration
    }

    fn increment(&mut self, window_duration: Duration) {
        if self.is_new_window(window_duration) {
            self.count = 1;
            self.window_start = Instant::now();
        } else {
            self.count += 1;
        }
    }

    /// Whole seconds until the window resets, at least 1
    fn retry_after(&self, window_duration: Duration) -> u64 {
        let remaining = window_duration.saturating_sub(self.window_start.elapsed());
        remaining.as_secs_f64().ceil().max(1.0) as u64
    }
}

/// Attempt limiter for sign-in
pub struct RateLimiter {
    entries: Arc<RwLock<HashMap<String, RateLimitEntry>>>,
    max_attempts: u32,
    window_duration: Duration,
    max_tracked_keys: usize,
}

impl RateLimiter {
    pub fn new(max_attempts: u32, window_duration: Duration) -> Self {
        Self::with_max_tracked_keys(max_attempts, window_duration, DEFAULT_MAX_TRACKED_KEYS)
    }

    /// Create a limiter with an explicit in-memory key cap
    pub fn with_max_tracked_keys(
        max_attempts: u32,
        window_duration: Duration,
        max_tracked_keys: usize,
    ) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_attempts: max_attempts.max(1),
            window_duration,
            max_tracked_keys: max_tracked_keys.max(1),
        }
    }

    fn prune_expired_locked(
        entries: &mut HashMap<String, RateLimitEntry>,
        window_duration: Duration,
    ) {
        entries.retain(|_, value| !value.is_new_window(window_duration));
    }

    fn evict_oldest_locked(entries: &mut HashMap<String, RateLimitEntry>) {
        if let Some(oldest_key) = entries
            .iter()
            .min_by_key(|(_, value)| value.window_start)
            .map(|(key, _)| key.clone())
        {
            entries.remove(&oldest_key);
        }
    }

    /// Record an attempt for `key`
    ///
    /// # Errors
    /// `RateLimited` with the seconds left in the window once the limit is hit
    pub async fn check_and_increment(&self, key: &str) -> Result<(), AppError> {
        let mut entries = self.entries.write().await;

        if !entries.contains_key(key) && entries.len() >= self.max_tracked_keys {
            Self::prune_expired_locked(&mut entries, self.window_duration);
            if entries.len() >= self.max_tracked_keys {
                Self::evict_oldest_locked(&mut entries);
            }
        }

        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| RateLimitEntry {
                count: 0,
                window_start: Instant::now(),
            });

        if !entry.is_new_window(self.window_duration) && entry.count >= self.max_attempts {
            let retry_after_secs = entry.retry_after(self.window_duration);
            tracing::warn!(key, retry_after_secs, "Sign-in rate limit exceeded");
            return Err(AppError::RateLimited { retry_after_secs });
        }

        entry.increment(self.window_duration);
        Ok(())
    }

    /// Forget attempts for `key`, e.g. after a successful sign-in
    pub async fn reset(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// Number of tracked keys
    pub async fn tracked_keys(&self) -> usize {
        self.entries.read().await.len()
    }
}
