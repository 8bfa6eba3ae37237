//! Client-side throttle for chat requests over a rolling minute.

use chrono::Utc;
use tracing::warn;

use crate::store::{KeyValueStore, StoreError};

pub const RATE_LIMIT_KEY: &str = "chat_limit_history";
pub const WINDOW_MS: i64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after_secs: u64 },
}

/// Keeps the epoch-millisecond timestamps of recent requests in a
/// [`KeyValueStore`] under [`RATE_LIMIT_KEY`].
#[derive(Debug)]
pub struct ChatRateLimiter<S> {
    store: S,
    max_requests: u32,
}

impl<S: KeyValueStore> ChatRateLimiter<S> {
    pub fn new(store: S, max_requests: u32) -> Self {
        Self { store, max_requests: max_requests.max(1) }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn check(&mut self) -> Result<RateDecision, StoreError> {
        self.check_at(Utc::now().timestamp_millis())
    }

    /// Prune expired entries, then either record `now_ms` or report how long
    /// to wait until the oldest retained entry expires.
    pub fn check_at(&mut self, now_ms: i64) -> Result<RateDecision, StoreError> {
        let mut timestamps = self.load()?;
        // Entries further in the future than one window cannot come from this
        // clock and are dropped along with the expired ones.
        timestamps.retain(|&t| {
            now_ms.checked_sub(t).is_some_and(|age| (-WINDOW_MS..WINDOW_MS).contains(&age))
        });

        let decision = if timestamps.len() >= self.max_requests as usize {
            let oldest = timestamps.iter().copied().min().unwrap_or(now_ms);
            let age = now_ms.saturating_sub(oldest);
            let remaining_ms = WINDOW_MS.saturating_sub(age).clamp(0, WINDOW_MS) as u64;
            let retry_after_secs = remaining_ms.div_ceil(1000);
            warn!(retry_after_secs, max = self.max_requests, "Chat rate limit reached");
            RateDecision::Limited { retry_after_secs }
        } else {
            timestamps.push(now_ms);
            RateDecision::Allowed
        };

        self.save(&timestamps)?;
        Ok(decision)
    }

    /// Timestamps currently stored, including expired ones not yet pruned.
    pub fn history(&self) -> Result<Vec<i64>, StoreError> {
        self.load()
    }

    fn load(&self) -> Result<Vec<i64>, StoreError> {
        let Some(raw) = self.store.get(RATE_LIMIT_KEY)? else {
            return Ok(Vec::new());
        };

        Ok(serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!(error = %err, "Discarding unreadable rate limit history");
            Vec::new()
        }))
    }

    fn save(&mut self, timestamps: &[i64]) -> Result<(), StoreError> {
        // Serializing a slice of integers cannot fail.
        let json = serde_json::to_string(timestamps).unwrap_or_else(|_| "[]".to_string());
        self.store.set(RATE_LIMIT_KEY, json)
    }
}
