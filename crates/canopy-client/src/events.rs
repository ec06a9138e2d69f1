//! Controller events
//!
//! Every user-visible transition raises a [`TreeEvent`]. Listeners run
//! synchronously before the default action and any of them may veto it.
//! Events that went through are also published on a broadcast channel for
//! passive observers. Outcomes the server has already committed (`Remove`,
//! `Move`) are notifications only and cannot be vetoed.

use crate::tree::NodeKey;
use canopy_core::Direction;
use std::sync::Arc;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    BeforeSelect { key: NodeKey },
    Selected { key: NodeKey },
    SelectError { key: NodeKey, message: String },
    Expand { key: NodeKey },
    Collapse { key: NodeKey },
    ExpandAll,
    CollapseAll,
    /// `key` is `None` for the check-all box
    Checked { key: Option<NodeKey> },
    Unchecked { key: Option<NodeKey> },
    /// New selection value: comma-joined keys and labels
    Change { keys: String, description: String },
    Create { parent: NodeKey },
    CreateRoot,
    BeforeRemove { key: NodeKey },
    Remove { key: NodeKey, message: String },
    RemoveError { key: NodeKey, message: String },
    BeforeMove { direction: Direction, from: NodeKey, to: NodeKey },
    Move { direction: Direction, from: NodeKey, to: NodeKey, message: String },
    MoveError { direction: Direction, from: NodeKey, to: NodeKey, message: String },
    Search { query: String },
}

impl TreeEvent {
    /// Event name as exposed to hosts
    pub fn name(&self) -> &'static str {
        match self {
            Self::BeforeSelect { .. } => "beforeselect",
            Self::Selected { .. } => "selected",
            Self::SelectError { .. } => "selecterror",
            Self::Expand { .. } => "expand",
            Self::Collapse { .. } => "collapse",
            Self::ExpandAll => "expandall",
            Self::CollapseAll => "collapseall",
            Self::Checked { .. } => "checked",
            Self::Unchecked { .. } => "unchecked",
            Self::Change { .. } => "change",
            Self::Create { .. } => "create",
            Self::CreateRoot => "createroot",
            Self::BeforeRemove { .. } => "beforeremove",
            Self::Remove { .. } => "remove",
            Self::RemoveError { .. } => "removeerror",
            Self::BeforeMove { .. } => "beforemove",
            Self::Move { .. } => "move",
            Self::MoveError { .. } => "moveerror",
            Self::Search { .. } => "search",
        }
    }
}

/// Listener verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventControl {
    #[default]
    Proceed,
    /// Suppress the default action
    Veto,
}

type Listener = Arc<dyn Fn(&TreeEvent) -> EventControl + Send + Sync>;

/// Listener registry plus notification channel.
pub struct EventBus {
    listeners: Vec<Listener>,
    notify_tx: broadcast::Sender<TreeEvent>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (notify_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            listeners: Vec::new(),
            notify_tx,
        }
    }

    /// Register a listener that may veto default actions.
    pub fn listen<F>(&mut self, listener: F)
    where
        F: Fn(&TreeEvent) -> EventControl + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Receive every event that was not vetoed.
    pub fn subscribe(&self) -> broadcast::Receiver<TreeEvent> {
        self.notify_tx.subscribe()
    }

    /// Run listeners; `false` when any of them vetoed.
    ///
    /// All listeners see the event even after a veto.
    pub fn raise(&self, event: TreeEvent) -> bool {
        let vetoed = self
            .listeners
            .iter()
            .map(|listener| listener(&event))
            .fold(false, |acc, control| acc | (control == EventControl::Veto));
        if vetoed {
            tracing::debug!(event = event.name(), "default action vetoed");
            return false;
        }
        // No receivers is fine.
        let _ = self.notify_tx.send(event);
        true
    }

    /// Run listeners and publish without a veto point.
    ///
    /// Used for outcomes the server already committed; a listener verdict
    /// cannot undo them.
    pub fn notify(&self, event: TreeEvent) {
        for listener in &self.listeners {
            if listener(&event) == EventControl::Veto {
                tracing::debug!(event = event.name(), "veto ignored for committed outcome");
            }
        }
        let _ = self.notify_tx.send(event);
    }
}
