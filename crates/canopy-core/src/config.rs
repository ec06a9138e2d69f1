//! Canopy configuration
//!
//! A single immutable value handed to the signer, renderer, service and
//! controller at construction time. Loadable from TOML; every section and
//! field is optional and falls back to its default.

use crate::errors::{Result, TreeError};
use crate::messages::NodeTitles;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fallback salt used when no session is available to hold a random one.
pub const DEFAULT_FALLBACK_SALT: &str = "SET_A_SALT_FOR_CANOPY";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CanopyConfig {
    pub signature: SignatureConfig,
    pub render: RenderConfig,
    pub client: ClientConfig,
    pub titles: NodeTitles,
}

/// Signature subsystem settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
    /// Constant salt for session-less contexts. Tokens signed with it are
    /// only as secret as this configuration value.
    pub fallback_salt: String,
    /// Session key holding the per-session random salt
    pub session_salt_key: String,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            fallback_salt: DEFAULT_FALLBACK_SALT.to_string(),
            session_salt_key: "canopySalt".to_string(),
        }
    }
}

/// Hierarchy renderer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Placeholder shown for an empty tree
    pub empty_message: String,
    /// Prefix prepended to CSS-suffix icons
    pub icon_prefix: String,
    pub show_checkbox: bool,
    pub show_inactive: bool,
    pub is_admin: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            empty_message: "No valid tree nodes are available for display.".to_string(),
            icon_prefix: "kv-icon-".to_string(),
            show_checkbox: false,
            show_inactive: false,
            is_admin: false,
        }
    }
}

/// Client tree controller settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub cache_enabled: bool,
    pub cache_ttl_ms: u64,
    pub search_debounce_ms: u64,
    pub multiple: bool,
    pub cascade_select_children: bool,
    pub hide_unmatched_search_items: bool,
    /// URL of the manage action, used as the cache key base
    pub manage_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_ttl_ms: 300_000,
            search_debounce_ms: 250,
            multiple: false,
            cascade_select_children: true,
            hide_unmatched_search_items: true,
            manage_url: "/treemanager/node/manage".to_string(),
        }
    }
}

impl CanopyConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| TreeError::validation(format!("Invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.signature.fallback_salt.is_empty() {
            return Err(TreeError::validation("signature.fallback_salt must not be empty"));
        }
        if self.signature.session_salt_key.is_empty() {
            return Err(TreeError::validation(
                "signature.session_salt_key must not be empty",
            ));
        }
        if self.titles.node.is_empty() || self.titles.nodes.is_empty() {
            return Err(TreeError::validation("titles must not be empty"));
        }
        if self.client.search_debounce_ms == 0 {
            return Err(TreeError::validation(
                "client.search_debounce_ms must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn defaults_are_valid() {
        let config = CanopyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.client.cache_ttl_ms, 300_000);
        assert_eq!(config.client.search_debounce_ms, 250);
        assert!(config.client.cascade_select_children);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = CanopyConfig::from_toml_str(
            r#"
            [client]
            multiple = true
            cache_ttl_ms = 1000

            [titles]
            node = "folder"
            nodes = "folders"
            "#,
        )
        .unwrap();
        assert!(config.client.multiple);
        assert_eq!(config.client.cache_ttl_ms, 1000);
        assert!(config.client.hide_unmatched_search_items);
        assert_eq!(config.titles.node, "folder");
        assert_eq!(config.signature.fallback_salt, DEFAULT_FALLBACK_SALT);
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = CanopyConfig::load_from_file(Path::new("/nonexistent/canopy.toml")).unwrap_err();
        assert_matches!(err, TreeError::NotFound { .. });
    }

    #[test]
    fn empty_salt_is_rejected() {
        let err = CanopyConfig::from_toml_str("[signature]\nfallback_salt = \"\"\n").unwrap_err();
        assert_matches!(err, TreeError::Validation { .. });
    }
}
