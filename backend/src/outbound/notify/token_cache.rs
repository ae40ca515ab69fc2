//! Cached access token for the messaging channel.

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

/// Refresh this far before the channel says the token expires, so a token
/// handed out by the cache is never on the verge of dying mid-request.
const EXPIRY_MARGIN_SECONDS: i64 = 60;

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Owns the channel access token and its expiry.
///
/// The cache is a plain value held by the notifier; there is no process-wide
/// state. Callers pass `now` in so expiry stays testable.
#[derive(Debug, Default)]
pub struct AccessTokenCache {
    slot: Mutex<Option<CachedToken>>,
}

impl AccessTokenCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached token if it is still comfortably inside its expiry.
    pub async fn current(&self, now: DateTime<Utc>) -> Option<String> {
        let slot = self.slot.lock().await;
        slot.as_ref()
            .filter(|cached| cached.expires_at > now)
            .map(|cached| cached.token.clone())
    }

    /// Store a freshly fetched token that the channel reports valid for
    /// `expires_in_seconds`.
    pub async fn store(&self, token: String, now: DateTime<Utc>, expires_in_seconds: i64) {
        let lifetime = Duration::seconds((expires_in_seconds - EXPIRY_MARGIN_SECONDS).max(0));
        let mut slot = self.slot.lock().await;
        *slot = Some(CachedToken {
            token,
            expires_at: now + lifetime,
        });
    }

    /// Drop the cached token, forcing a refresh on the next use.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        *slot = None;
    }
}
