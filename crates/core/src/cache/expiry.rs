//! Expiration policy.
//!
//! Timestamps are integer seconds since the Unix epoch. A row is live while
//! `timeout > now`; a lifetime of 0 (or less) yields a row that is already
//! expired when written.

use chrono::Utc;

/// Current time in epoch seconds.
pub fn now() -> i64 {
    Utc::now().timestamp()
}

/// Whether a row with the given `timeout` is live at `now`.
pub fn is_live(timeout: i64, now: i64) -> bool {
    timeout > now
}

/// Turns requested lifetimes into absolute expiry timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationPolicy {
    default_lifetime: i64,
}

impl ExpirationPolicy {
    pub fn new(default_lifetime: i64) -> Self {
        Self { default_lifetime }
    }

    pub fn default_lifetime(&self) -> i64 {
        self.default_lifetime
    }

    /// The requested lifetime, or the configured default when none is given.
    pub fn lifetime(&self, requested: Option<i64>) -> i64 {
        requested.unwrap_or(self.default_lifetime)
    }

    /// Absolute timeout for a write happening at `now`.
    pub fn expires_at(&self, requested: Option<i64>, now: i64) -> i64 {
        now.saturating_add(self.lifetime(requested))
    }
}
