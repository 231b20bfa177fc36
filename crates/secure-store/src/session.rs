//! User session cache
//!
//! Keeps the signed-in user's session token in the store under the
//! [`StoragePolicy::user_session`] preset: encrypted, session-scoped, gone
//! after an hour.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, info};

use crate::crypto::generate_token;
use crate::error::Result;
use crate::store::{SecureStore, StoragePolicy};

const SESSION_KEY: &str = "user_session";

/// Session token for the signed-in user
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session ID for logging/revocation
    pub session_id: String,
    pub user_id: String,
    /// Dashboard role (e.g. "admin", "doctor", "receptionist")
    pub role: String,
    /// Random bearer token, 64 hex chars
    pub token: String,
}

impl Session {
    /// Create a session with a fresh random token
    pub fn create(user_id: &str, role: &str) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            role: role.to_string(),
            token: generate_token(32),
        }
    }

    /// Constant-time token comparison
    pub fn token_matches(&self, token: &str) -> bool {
        self.token.as_bytes().ct_eq(token.as_bytes()).into()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("user_id", &self.user_id)
            .field("role", &self.role)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Session cache over a [`SecureStore`]
pub struct SessionCache {
    store: Arc<SecureStore>,
    policy: StoragePolicy,
}

impl SessionCache {
    pub fn new(store: Arc<SecureStore>) -> Self {
        Self::with_policy(store, StoragePolicy::user_session())
    }

    pub fn with_policy(store: Arc<SecureStore>, policy: StoragePolicy) -> Self {
        Self { store, policy }
    }

    /// Start a new session, replacing any existing one
    pub async fn start(&self, user_id: &str, role: &str) -> Result<Session> {
        let session = Session::create(user_id, role);
        self.store.save(SESSION_KEY, &session, &self.policy).await?;

        info!("Started session {} for {}", session.session_id, user_id);
        Ok(session)
    }

    /// The current session, if one exists and has not expired
    pub async fn current(&self) -> Option<Session> {
        self.store.load(SESSION_KEY, &self.policy, None).await
    }

    /// Whether `token` belongs to the current session
    pub async fn validate(&self, token: &str) -> bool {
        match self.current().await {
            Some(session) => session.token_matches(token),
            None => false,
        }
    }

    /// End the current session (logout or lock)
    pub async fn end(&self) -> Result<()> {
        self.store.remove(SESSION_KEY).await?;
        debug!("Cleared session");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::time::Duration;

    fn cache() -> (SessionCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let store = SecureStore::builder().clock(clock.clone()).build();
        (SessionCache::new(Arc::new(store)), clock)
    }

    #[tokio::test]
    async fn test_start_and_current() {
        let (cache, _) = cache();

        let session = cache.start("u-17", "doctor").await.unwrap();

        assert_eq!(session.token.len(), 64);
        assert_eq!(cache.current().await, Some(session.clone()));
        assert!(cache.validate(&session.token).await);
        assert!(!cache.validate("forged").await);
    }

    #[tokio::test]
    async fn test_session_expires_after_an_hour() {
        let (cache, clock) = cache();
        let session = cache.start("u-17", "admin").await.unwrap();

        clock.advance(Duration::from_secs(3601));

        assert_eq!(cache.current().await, None);
        assert!(!cache.validate(&session.token).await);
    }

    #[tokio::test]
    async fn test_end() {
        let (cache, _) = cache();
        cache.start("u-17", "receptionist").await.unwrap();

        cache.end().await.unwrap();
        cache.end().await.unwrap();

        assert_eq!(cache.current().await, None);
    }

    #[test]
    fn test_debug_redacts_token() {
        let session = Session::create("u-1", "admin");
        assert!(!format!("{:?}", session).contains(&session.token));
    }
}
