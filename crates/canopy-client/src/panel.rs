//! Detail panel and alert state

use crate::tree::NodeKey;
use canopy_core::{NodeDetail, NodeFailure};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Info,
    Success,
    Danger,
}

impl AlertLevel {
    pub fn css(self) -> &'static str {
        match self {
            Self::Info => "alert-info",
            Self::Success => "alert-success",
            Self::Danger => "alert-danger",
        }
    }
}

/// Transient message above the detail form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
    /// Itemized cascade failures, shown under the message
    pub items: Vec<NodeFailure>,
}

impl Alert {
    pub fn new(level: AlertLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            items: Vec::new(),
        }
    }

    pub fn with_items(mut self, items: Vec<NodeFailure>) -> Self {
        self.items = items;
        self
    }
}

/// What the detail panel currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DetailPanel {
    /// "Select a node" prompt
    #[default]
    Empty,
    Loading { key: NodeKey },
    Loaded { key: NodeKey, detail: Box<NodeDetail> },
    Error { key: NodeKey, message: String },
}

impl DetailPanel {
    pub fn key(&self) -> Option<NodeKey> {
        match self {
            Self::Empty => None,
            Self::Loading { key } | Self::Loaded { key, .. } | Self::Error { key, .. } => {
                Some(*key)
            }
        }
    }

    pub fn detail(&self) -> Option<&NodeDetail> {
        match self {
            Self::Loaded { detail, .. } => Some(detail),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }
}
