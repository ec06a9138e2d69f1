//! Salt lifecycle
//!
//! One salt per application instance. With a session available, a random salt
//! is generated on first use and kept for the session's lifetime. Without one,
//! the configured constant is used. That fallback is only as secret as the
//! configuration file it comes from.

use canopy_core::{SessionEffects, SignatureConfig};
use rand::RngCore;
use std::fmt;

/// Where the active salt came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaltSource {
    /// Random salt persisted in the session
    Session,
    /// Configured constant, weaker guarantee
    Fallback,
}

/// Secret keying material for token signing.
#[derive(Clone, PartialEq, Eq)]
pub struct Salt {
    value: String,
    source: SaltSource,
}

impl Salt {
    /// Wrap a salt value with its origin.
    pub fn new(value: impl Into<String>, source: SaltSource) -> Self {
        Self {
            value: value.into(),
            source,
        }
    }

    /// Key bytes for the MAC
    pub fn as_bytes(&self) -> &[u8] {
        self.value.as_bytes()
    }

    /// Where the salt came from
    pub fn source(&self) -> SaltSource {
        self.source
    }

    /// Whether tokens signed with this salt rely on the configured constant
    pub fn is_degraded(&self) -> bool {
        self.source == SaltSource::Fallback
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Salt")
            .field("value", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Resolves the salt for the current context.
#[derive(Debug, Clone)]
pub struct SaltPolicy {
    fallback: String,
    session_key: String,
}

impl SaltPolicy {
    /// Policy from the signature section of the configuration.
    pub fn from_config(config: &SignatureConfig) -> Self {
        Self {
            fallback: config.fallback_salt.clone(),
            session_key: config.session_salt_key.clone(),
        }
    }

    /// Read the session salt, creating it on first use.
    pub async fn resolve<S>(&self, session: &S) -> Salt
    where
        S: SessionEffects + ?Sized,
    {
        if !session.is_available() {
            tracing::warn!("no session available; signing with the configured fallback salt");
            return Salt::new(self.fallback.clone(), SaltSource::Fallback);
        }

        if let Some(existing) = session.session_get(&self.session_key).await {
            if !existing.is_empty() {
                return Salt::new(existing, SaltSource::Session);
            }
        }

        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let fresh = hex::encode(bytes);
        session.session_set(&self.session_key, fresh.clone()).await;
        tracing::debug!(key = %self.session_key, "generated session salt");
        Salt::new(fresh, SaltSource::Session)
    }
}
