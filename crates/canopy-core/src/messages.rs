//! User-facing message templates
//!
//! Templates use `{node}` / `{nodes}` placeholders which are filled from the
//! configured [`NodeTitles`].

use serde::{Deserialize, Serialize};

/// Singular and plural labels for a node in user-facing messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeTitles {
    pub node: String,
    pub nodes: String,
}

impl Default for NodeTitles {
    fn default() -> Self {
        Self {
            node: "node".to_string(),
            nodes: "nodes".to_string(),
        }
    }
}

impl NodeTitles {
    /// Fill the `{node}` and `{nodes}` placeholders of a template.
    pub fn format(&self, template: &str) -> String {
        template
            .replace("{nodes}", &self.nodes)
            .replace("{node}", &self.node)
    }
}

pub const CREATED: &str = "The {node} was successfully created.";
pub const CREATE_FAILED: &str = "Error while creating the {node}. Please try again later.";
pub const SAVED: &str = "Saved the {node} details successfully.";
pub const SAVE_FAILED: &str = "Error while saving the {node}. Please try again later.";
pub const CHILD_NOT_ALLOWED: &str = "You cannot add children under this {node}.";
pub const VIEW_FAILED: &str = "Error while viewing the {node}. Please try again later.";
pub const REMOVED: &str = "The {node} was removed successfully.";
pub const REMOVE_FAILED: &str = "Error removing the {node}. Please try again later.";
pub const NOT_REMOVABLE: &str = "The selected {node} cannot be removed.";
pub const HAS_DESCENDANTS: &str =
    "The {node} has children and cannot be deleted without removing them.";
pub const MOVED: &str = "The {node} was moved successfully.";
pub const MOVE_FAILED: &str = "Error while moving the {node}. Please try again later.";
pub const NOT_MOVABLE: &str = "The selected {node} cannot be moved.";
pub const ROOT_REORDER: &str =
    "Cannot move root level {nodes} before or after other root level {nodes}.";

/// Refusal shown when a request signature fails to verify.
pub fn operation_disallowed(action: &str) -> String {
    format!(
        "Operation Disallowed. Invalid request signature detected during tree data {action} \
         action! Please refresh the page and retry."
    )
}
