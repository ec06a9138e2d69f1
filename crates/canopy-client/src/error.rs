//! Client controller errors

use crate::tree::NodeKey;
use canopy_core::TransportError;
use thiserror::Error;

/// Why a controller action did not run or did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("No node is selected")]
    NoFocus,

    #[error("Node {key} is not in the tree")]
    UnknownNode { key: NodeKey },

    #[error("The selected node is disabled")]
    Disabled { key: NodeKey },

    #[error("A request for node {key} is already in progress")]
    Busy { key: NodeKey },

    #[error("Cannot create a node here. Select a saved node first.")]
    InvalidCreateTarget,

    #[error("You cannot add children under this node.")]
    ChildNotAllowed { key: NodeKey },

    #[error("Cannot move this node as the node details are not saved yet.")]
    UnsavedMove { key: NodeKey },

    #[error("The selected node cannot be moved {direction}.")]
    NotMovable { key: NodeKey, direction: &'static str },

    #[error("Already at top.")]
    AtTop,

    #[error("Already at bottom.")]
    AtBottom,

    #[error("Already at leftmost.")]
    AtLeftmost,

    #[error("No sibling above to move into.")]
    AtRightmost,

    #[error("Checking every node needs multiple selection")]
    SingleSelect,

    #[error("{message}")]
    Rejected { message: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ClientError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
