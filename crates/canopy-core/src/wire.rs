//! Wire contract of the four node actions
//!
//! Every request carries its signed payload plus the `signature` minted by a
//! prior response. Every response is an [`ActionEnvelope`] of `{out, status}`.

use crate::errors::{FieldError, NodeFailure};
use crate::node::{Direction, Node, NodeAttributes, NodeId};
use crate::protocol::{ManagePayload, MovePayload, RemovePayload, SavePayload};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Parent key value meaning "attach as a new root".
pub const ROOT_KEY: &str = "root";

/// Where a new node is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ParentKey {
    Root,
    Node(NodeId),
}

impl fmt::Display for ParentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str(ROOT_KEY),
            Self::Node(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for ParentKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ROOT_KEY {
            return Ok(Self::Root);
        }
        s.parse::<NodeId>()
            .map(Self::Node)
            .map_err(|_| format!("invalid parent key '{s}'"))
    }
}

impl From<ParentKey> for String {
    fn from(key: ParentKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for ParentKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// View or edit one node, or open the form for a new one when `id` is absent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ManageRequest {
    pub id: Option<NodeId>,
    pub parent_key: Option<ParentKey>,
    #[serde(flatten)]
    pub payload: ManagePayload,
    /// Manage token from the previous response
    pub signature: String,
    /// Remove token passed through to the detail view
    pub remove_token: String,
    /// Move token passed through to the detail view
    pub move_token: String,
}

/// Submit the detail form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveRequest {
    /// Existing node; ignored when `tree_node_modify` is set
    pub id: Option<NodeId>,
    pub attrs: NodeAttributes,
    /// Create a new node and attach it under `parent_key`
    pub tree_node_modify: bool,
    pub parent_key: Option<ParentKey>,
    /// Session key for the selected node; not covered by the signature
    pub selected_node_param: Option<String>,
    #[serde(flatten)]
    pub payload: SavePayload,
    pub signature: String,
}

/// Delete or deactivate a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveRequest {
    pub id: NodeId,
    #[serde(flatten)]
    pub payload: RemovePayload,
    pub signature: String,
}

/// Reposition a node relative to `id_to`.
///
/// `id_to` is the sibling for up/down, the current parent for left, and the
/// previous sibling for right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub id_from: NodeId,
    pub id_to: NodeId,
    #[serde(rename = "dir")]
    pub direction: Direction,
    #[serde(flatten)]
    pub payload: MovePayload,
    pub signature: String,
}

/// Outcome marker of an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Success,
    Error,
}

/// Tokens handed to the client for its next requests.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionTokens {
    pub manage: String,
    /// Minted per form, absent on the initial page bundle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save: Option<String>,
    pub remove: String,
    #[serde(rename = "move")]
    pub move_: String,
}

/// Detail panel content returned by `manage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDetail {
    /// Persisted node, `None` for a new node form
    pub node: Option<Node>,
    /// Form values; policy defaults for a new node
    pub attrs: NodeAttributes,
    pub parent_key: Option<ParentKey>,
    /// Rendered breadcrumb trail
    pub breadcrumbs: String,
    pub tokens: ActionTokens,
    /// Display options echoed back for the form
    pub options: ManagePayload,
}

impl NodeDetail {
    pub fn is_new(&self) -> bool {
        self.node.is_none()
    }
}

/// Content of `out`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutput {
    /// Human-readable message
    Message(String),
    /// Detail markup for `manage`
    Detail(Box<NodeDetail>),
    /// Saved node and confirmation message
    Saved { id: NodeId, message: String },
    /// Itemized cascade failures
    Failures {
        message: String,
        items: Vec<NodeFailure>,
    },
    /// Field-level store rejections
    FieldErrors {
        message: String,
        fields: Vec<FieldError>,
    },
}

impl ActionOutput {
    /// Headline message, empty for detail output
    pub fn message(&self) -> &str {
        match self {
            Self::Message(message)
            | Self::Saved { message, .. }
            | Self::Failures { message, .. }
            | Self::FieldErrors { message, .. } => message,
            Self::Detail(_) => "",
        }
    }
}

/// Uniform response of every action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    pub out: ActionOutput,
    pub status: ActionStatus,
}

impl ActionEnvelope {
    pub fn success(out: ActionOutput) -> Self {
        Self {
            out,
            status: ActionStatus::Success,
        }
    }

    pub fn error(out: ActionOutput) -> Self {
        Self {
            out,
            status: ActionStatus::Error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Success
    }

    /// Detail payload of a successful manage response
    pub fn detail(&self) -> Option<&NodeDetail> {
        match &self.out {
            ActionOutput::Detail(detail) => Some(detail),
            _ => None,
        }
    }
}
