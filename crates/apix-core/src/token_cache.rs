//! Shared bearer credential with coordinated refresh.
//!
//! Readers take a snapshot of the current credential without waiting on the
//! refresh path. Refreshes are serialized by a dedicated async mutex and the
//! cached value is re-checked after acquiring it, so callers that race past a
//! stale snapshot wait for the one in-flight issuance instead of starting
//! their own.

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::ConnectorError;

/// Nominal lifetime of a token issued by the API.
pub const TOKEN_VALIDITY: Duration = Duration::from_secs(3_600);

/// Bearer token plus the instant after which it must be renewed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    expires_at: Instant,
}

impl Credential {
    pub fn new(token: impl Into<String>, expires_at: Instant) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_valid_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug)]
pub struct TokenCache {
    current: RwLock<Option<Arc<Credential>>>,
    refresh_lock: Mutex<()>,
    validity: Duration,
    refresh_skew: Duration,
}

impl TokenCache {
    pub fn new(refresh_skew: Duration) -> Self {
        Self::with_validity(TOKEN_VALIDITY, refresh_skew)
    }

    pub fn with_validity(validity: Duration, refresh_skew: Duration) -> Self {
        Self {
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            validity,
            refresh_skew,
        }
    }

    /// Snapshot of the cached credential, valid or not.
    pub fn current(&self) -> Option<Arc<Credential>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns a usable token, calling `issue` when the cache is empty, expired,
    /// or `force_refresh` is set.
    ///
    /// At most one `issue` call is in flight at a time; callers queued behind it
    /// reuse its result unless they asked for a forced refresh themselves.
    pub async fn get_valid_token<F, Fut>(
        &self,
        force_refresh: bool,
        issue: F,
    ) -> Result<String, ConnectorError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, ConnectorError>>,
    {
        if !force_refresh {
            if let Some(token) = self.valid_token(Instant::now()) {
                return Ok(token);
            }
        }

        let _guard = self.refresh_lock.lock().await;

        let refresh_now = Instant::now();
        if !force_refresh {
            if let Some(token) = self.valid_token(refresh_now) {
                debug!("credential refreshed by a concurrent caller");
                return Ok(token);
            }
        }

        let token = issue().await?;
        let lifetime = self.validity.saturating_sub(self.refresh_skew);
        let credential = Arc::new(Credential::new(token.clone(), refresh_now + lifetime));
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(credential);

        info!(
            expires_in_secs = lifetime.as_secs(),
            forced = force_refresh,
            "issued new API credential"
        );
        Ok(token)
    }

    /// Drops the cached credential so the next caller re-issues one.
    pub fn invalidate(&self) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn valid_token(&self, now: Instant) -> Option<String> {
        self.current()
            .filter(|credential| credential.is_valid_at(now))
            .map(|credential| credential.token.clone())
    }
}
