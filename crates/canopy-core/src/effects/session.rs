//! Session effect interface

use async_trait::async_trait;

/// Per-user key/value session storage.
///
/// Hosts without a session (batch jobs, plain API clients) report
/// `is_available() == false`; callers then fall back to non-session
/// behaviour instead of writing into the void.
#[async_trait]
pub trait SessionEffects: Send + Sync {
    /// Whether a session backs this context
    fn is_available(&self) -> bool {
        true
    }

    /// Read a value
    async fn session_get(&self, key: &str) -> Option<String>;

    /// Write a value
    async fn session_set(&self, key: &str, value: String);
}
