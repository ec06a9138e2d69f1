//! Signed action payloads
//!
//! Each mutating action protects a fixed, ordered set of request fields. The
//! canonical string of a payload is the concatenation of those fields in that
//! order; anything outside the list is not covered by the signature.
//!
//! - manage: store class, admin, soft delete, form buttons, id attribute,
//!   name attribute, current url, node view, selected-node key, form
//!   options, additional views, icon choices, breadcrumbs
//! - save: new record, current url, store class
//! - remove: store class, soft delete
//! - move: store class, allow new roots

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator placed between canonical fields so that adjacent values cannot
/// be shifted into one another.
pub const FIELD_SEPARATOR: char = '\u{1f}';

/// The four actions exposed by the node action service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Manage,
    Save,
    Remove,
    Move,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manage => "manage",
            Self::Save => "save",
            Self::Remove => "remove",
            Self::Move => "move",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payload whose canonical form is protected by a signature token.
pub trait SignedPayload {
    /// Action the payload belongs to
    const KIND: ActionKind;

    /// Canonical field values, in signing order
    fn canonical_fields(&self) -> Vec<String>;

    /// Deterministic canonical string
    fn canonical(&self) -> String {
        let fields = self.canonical_fields();
        let mut out = String::new();
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                out.push(FIELD_SEPARATOR);
            }
            out.push_str(field);
        }
        out
    }
}

fn flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

/// Breadcrumb rendering options carried in the manage payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreadcrumbConfig {
    /// Number of trailing crumbs, the node included; `None` shows every ancestor
    pub depth: Option<u32>,
    pub glue: String,
    /// CSS class for the current node's crumb; empty disables the wrapper
    pub active_css: String,
    /// Label used for a node that has not been saved yet
    pub untitled: String,
}

impl Default for BreadcrumbConfig {
    fn default() -> Self {
        Self {
            depth: None,
            glue: " &raquo; ".to_string(),
            active_css: "kv-crumb-active".to_string(),
            untitled: "Untitled".to_string(),
        }
    }
}

/// Canonical fields of a `manage` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagePayload {
    pub store_class: String,
    pub is_admin: bool,
    pub soft_delete: bool,
    pub show_form_buttons: bool,
    pub show_id_attribute: bool,
    pub show_name_attribute: bool,
    pub current_url: String,
    pub node_view: String,
    /// Session key under which the saved node id is remembered
    pub selected_node_param: String,
    pub form_options: serde_json::Value,
    pub additional_views: serde_json::Value,
    pub icon_choices: serde_json::Value,
    pub breadcrumbs: BreadcrumbConfig,
}

impl Default for ManagePayload {
    fn default() -> Self {
        Self {
            store_class: String::new(),
            is_admin: false,
            soft_delete: true,
            show_form_buttons: true,
            show_id_attribute: true,
            show_name_attribute: true,
            current_url: String::new(),
            node_view: String::new(),
            selected_node_param: DEFAULT_SELECTED_NODE_PARAM.to_string(),
            form_options: serde_json::Value::Object(serde_json::Map::new()),
            additional_views: serde_json::Value::Object(serde_json::Map::new()),
            icon_choices: serde_json::Value::Array(Vec::new()),
            breadcrumbs: BreadcrumbConfig::default(),
        }
    }
}

/// Session key used when a request does not name one.
pub const DEFAULT_SELECTED_NODE_PARAM: &str = "kvNodeId";

impl SignedPayload for ManagePayload {
    const KIND: ActionKind = ActionKind::Manage;

    fn canonical_fields(&self) -> Vec<String> {
        vec![
            self.store_class.clone(),
            flag(self.is_admin),
            flag(self.soft_delete),
            flag(self.show_form_buttons),
            flag(self.show_id_attribute),
            flag(self.show_name_attribute),
            self.current_url.clone(),
            self.node_view.clone(),
            self.selected_node_param.clone(),
            self.form_options.to_string(),
            self.additional_views.to_string(),
            self.icon_choices.to_string(),
            serde_json::to_string(&self.breadcrumbs).unwrap_or_default(),
        ]
    }
}

/// Canonical fields of a `save` request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SavePayload {
    pub was_new_record: bool,
    pub current_url: String,
    pub store_class: String,
}

impl SignedPayload for SavePayload {
    const KIND: ActionKind = ActionKind::Save;

    fn canonical_fields(&self) -> Vec<String> {
        vec![
            flag(self.was_new_record),
            self.current_url.clone(),
            self.store_class.clone(),
        ]
    }
}

/// Canonical fields of a `remove` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemovePayload {
    pub store_class: String,
    pub soft_delete: bool,
}

impl Default for RemovePayload {
    fn default() -> Self {
        Self {
            store_class: String::new(),
            soft_delete: true,
        }
    }
}

impl SignedPayload for RemovePayload {
    const KIND: ActionKind = ActionKind::Remove;

    fn canonical_fields(&self) -> Vec<String> {
        vec![self.store_class.clone(), flag(self.soft_delete)]
    }
}

/// Canonical fields of a `move` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovePayload {
    pub store_class: String,
    pub allow_new_roots: bool,
}

impl Default for MovePayload {
    fn default() -> Self {
        Self {
            store_class: String::new(),
            allow_new_roots: true,
        }
    }
}

impl SignedPayload for MovePayload {
    const KIND: ActionKind = ActionKind::Move;

    fn canonical_fields(&self) -> Vec<String> {
        vec![self.store_class.clone(), flag(self.allow_new_roots)]
    }
}

/// Host policy carried by the signed payloads.
///
/// The server acts on these values only through the payloads, and the client
/// reads them back from the same payloads, so both sides see one copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionPolicy {
    pub soft_delete: bool,
    pub is_admin: bool,
    pub allow_new_roots: bool,
}

impl Default for ActionPolicy {
    fn default() -> Self {
        Self {
            soft_delete: true,
            is_admin: false,
            allow_new_roots: true,
        }
    }
}

impl ActionPolicy {
    pub fn manage_payload(&self, store_class: &str, current_url: &str) -> ManagePayload {
        ManagePayload {
            store_class: store_class.to_string(),
            is_admin: self.is_admin,
            soft_delete: self.soft_delete,
            current_url: current_url.to_string(),
            ..ManagePayload::default()
        }
    }

    pub fn remove_payload(&self, store_class: &str) -> RemovePayload {
        RemovePayload {
            store_class: store_class.to_string(),
            soft_delete: self.soft_delete,
        }
    }

    pub fn move_payload(&self, store_class: &str) -> MovePayload {
        MovePayload {
            store_class: store_class.to_string(),
            allow_new_roots: self.allow_new_roots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_flows_into_every_payload() {
        let policy = ActionPolicy {
            soft_delete: false,
            is_admin: true,
            allow_new_roots: false,
        };
        let manage = policy.manage_payload("Tree", "/admin");
        assert!(!manage.soft_delete);
        assert!(manage.is_admin);
        assert_eq!(manage.current_url, "/admin");
        assert!(!policy.remove_payload("Tree").soft_delete);
        assert!(!policy.move_payload("Tree").allow_new_roots);
    }

    #[test]
    fn manage_canonical_has_thirteen_fields_in_order() {
        let payload = ManagePayload {
            store_class: "Tree".into(),
            is_admin: true,
            ..ManagePayload::default()
        };
        let fields = payload.canonical_fields();
        assert_eq!(fields.len(), 13);
        assert_eq!(fields[0], "Tree");
        assert_eq!(fields[1], "1");
        assert_eq!(fields[8], DEFAULT_SELECTED_NODE_PARAM);
        assert_eq!(fields[9], "{}");
    }

    #[test]
    fn separator_keeps_fields_apart() {
        let a = RemovePayload { store_class: "Tree1".into(), soft_delete: false };
        let b = MovePayload { store_class: "Tree".into(), allow_new_roots: true };
        assert_ne!(a.canonical(), b.canonical());
        assert_eq!(a.canonical(), format!("Tree1{FIELD_SEPARATOR}0"));
    }

    #[test]
    fn save_canonical_order() {
        let payload = SavePayload {
            was_new_record: true,
            current_url: "/tree".into(),
            store_class: "Tree".into(),
        };
        assert_eq!(payload.canonical_fields(), vec!["1", "/tree", "Tree"]);
    }
}
