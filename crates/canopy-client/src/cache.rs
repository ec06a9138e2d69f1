//! Time-bounded response cache keyed by request URL

use canopy_core::protocol::FIELD_SEPARATOR;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Default lifetime of a cached read, in milliseconds.
pub const DEFAULT_TTL_MS: u64 = 300_000;

/// Query parameter carrying the cache discriminator.
pub const QUERY_PARAM: &str = "kvtree";

#[derive(Debug, Clone)]
struct Entry<V> {
    stored_at: u64,
    value: V,
}

/// Entries are valid while `now - stored_at < ttl`. A TTL of zero makes every
/// lookup miss without dropping the entries.
#[derive(Debug, Clone)]
pub struct ResponseCache<V> {
    ttl_ms: u64,
    entries: HashMap<String, Entry<V>>,
}

impl<V> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_TTL_MS)
    }
}

impl<V> ResponseCache<V> {
    pub fn with_ttl(ttl_ms: u64) -> Self {
        Self {
            ttl_ms,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> u64 {
        self.ttl_ms
    }

    pub fn set_ttl(&mut self, ttl_ms: u64) {
        self.ttl_ms = ttl_ms;
    }

    /// Whether a fresh entry exists for `url` at `now_ms`.
    pub fn exists(&self, url: &str, now_ms: u64) -> bool {
        self.entries
            .get(url)
            .is_some_and(|entry| now_ms.saturating_sub(entry.stored_at) < self.ttl_ms)
    }

    /// Stored value regardless of age; pair with [`Self::exists`].
    pub fn get(&self, url: &str) -> Option<&V> {
        self.entries.get(url).map(|entry| &entry.value)
    }

    /// Fresh value for `url`, if any
    pub fn fresh(&self, url: &str, now_ms: u64) -> Option<&V> {
        if self.exists(url, now_ms) {
            self.get(url)
        } else {
            None
        }
    }

    /// Replace the entry for `url`.
    pub fn set(&mut self, url: impl Into<String>, value: V, now_ms: u64) {
        self.entries.insert(
            url.into(),
            Entry {
                stored_at: now_ms,
                value,
            },
        );
    }

    pub fn remove(&mut self, url: &str) -> Option<V> {
        self.entries.remove(url).map(|entry| entry.value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cache URL for a manage read of `key` (or a new node under `parent`).
///
/// The discriminator is a SHA-256 digest over the separated inputs, so
/// distinct reads never share an entry.
pub fn manage_url(
    base: &str,
    key: Option<&str>,
    store_class: &str,
    is_admin: bool,
    parent: Option<&str>,
) -> String {
    let mut hasher = Sha256::new();
    for field in [
        key.unwrap_or_default(),
        store_class,
        if is_admin { "1" } else { "0" },
        parent.unwrap_or_default(),
    ] {
        hasher.update(field.as_bytes());
        hasher.update([FIELD_SEPARATOR as u8]);
    }
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}{QUERY_PARAM}={}", hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_expire_at_ttl() {
        let mut cache = ResponseCache::with_ttl(1000);
        cache.set("/a", 1, 5000);
        assert!(cache.exists("/a", 5999));
        assert!(!cache.exists("/a", 6000));
        assert_eq!(cache.get("/a"), Some(&1));
        assert_eq!(cache.fresh("/a", 6000), None);
    }

    #[test]
    fn zero_ttl_misses_without_dropping() {
        let mut cache = ResponseCache::with_ttl(1000);
        cache.set("/a", "x", 0);
        cache.set_ttl(0);
        assert!(!cache.exists("/a", 0));
        cache.set_ttl(1000);
        assert!(cache.exists("/a", 1));
        assert_eq!(cache.remove("/a"), Some("x"));
        assert!(cache.is_empty());
    }

    #[test]
    fn manage_url_discriminates_inputs() {
        let a = manage_url("/node/manage", Some("1"), "Tree", false, None);
        let b = manage_url("/node/manage", Some("2"), "Tree", false, None);
        let c = manage_url("/node/manage", Some("1"), "Tree", true, None);
        assert!(a.starts_with("/node/manage?kvtree="));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, manage_url("/node/manage", Some("1"), "Tree", false, None));
        let nested = manage_url("/m?r=node", None, "Tree", false, Some("root"));
        assert!(nested.starts_with("/m?r=node&kvtree="));
    }

    #[test]
    fn colliding_rolling_hash_inputs_get_distinct_keys() {
        // "Aa" and "BB" share a 31-multiplier string hash.
        let aa = manage_url("/node/manage", Some("Aa"), "Tree", false, None);
        let bb = manage_url("/node/manage", Some("BB"), "Tree", false, None);
        assert_ne!(aa, bb);

        let mut cache = ResponseCache::with_ttl(1000);
        cache.set(aa.clone(), "node Aa", 0);
        assert!(!cache.exists(&bb, 1));
        assert_eq!(cache.fresh(&aa, 1), Some(&"node Aa"));
    }

    #[test]
    fn shifted_fields_do_not_alias() {
        let split = manage_url("/m", Some("1"), "2Tree", false, None);
        let joined = manage_url("/m", Some("12"), "Tree", false, None);
        assert_ne!(split, joined);
    }
}
