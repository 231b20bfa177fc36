//! Storage policies and named presets

use std::time::Duration;

/// Encryption, scope and expiry configuration bound to a logical store
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoragePolicy {
    /// Encrypt values and record an integrity hash
    pub encrypt: bool,
    /// Use the session medium instead of the durable one
    pub session_scoped: bool,
    /// Records older than this are discarded
    pub max_age: Option<Duration>,
    /// Shared key-derivation input for every key under this policy.
    /// `None` derives each record's key from its storage key.
    pub key_domain: Option<String>,
}

impl StoragePolicy {
    /// Plaintext, durable, never expires
    pub fn durable() -> Self {
        Self::default()
    }

    /// Encrypted, session-scoped API key cache, 24h lifetime
    pub fn api_keys() -> Self {
        Self::durable()
            .encrypted()
            .session()
            .with_max_age(Duration::from_secs(24 * 60 * 60))
            .with_key_domain("api-keys")
    }

    /// Encrypted, session-scoped user session cache, 1h lifetime
    pub fn user_session() -> Self {
        Self::durable()
            .encrypted()
            .session()
            .with_max_age(Duration::from_secs(60 * 60))
    }

    pub fn encrypted(mut self) -> Self {
        self.encrypt = true;
        self
    }

    pub fn session(mut self) -> Self {
        self.session_scoped = true;
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn with_key_domain(mut self, domain: impl Into<String>) -> Self {
        self.key_domain = Some(domain.into());
        self
    }
}
