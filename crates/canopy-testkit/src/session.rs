//! In-memory session

use async_lock::RwLock;
use async_trait::async_trait;
use canopy_core::SessionEffects;
use std::collections::HashMap;
use std::sync::Arc;

/// Session store for testing. A detached session reports itself unavailable,
/// standing in for contexts that have no session at all.
#[derive(Debug, Clone)]
pub struct MemorySession {
    data: Arc<RwLock<HashMap<String, String>>>,
    available: bool,
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySession {
    /// Create an empty, available session
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
            available: true,
        }
    }

    /// Create a session-less context
    pub fn detached() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Snapshot of stored values (for assertions)
    pub async fn snapshot(&self) -> HashMap<String, String> {
        self.data.read().await.clone()
    }
}

#[async_trait]
impl SessionEffects for MemorySession {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn session_get(&self, key: &str) -> Option<String> {
        if !self.available {
            return None;
        }
        self.data.read().await.get(key).cloned()
    }

    async fn session_set(&self, key: &str, value: String) {
        if self.available {
            self.data.write().await.insert(key.to_string(), value);
        }
    }
}
