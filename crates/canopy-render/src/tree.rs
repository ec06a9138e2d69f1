//! One-pass nested rendering
//!
//! Consumes nodes ordered by `(root_id, left)` and emits a flat stream of
//! open/close events. Nesting is derived purely from the `depth` deltas
//! between consecutive emitted nodes, so the input ordering is a hard
//! requirement: this is not a tree builder over parent pointers.

use canopy_core::{Direction, IconKind, Node, NodeId, RenderConfig};
use serde::{Deserialize, Serialize};

/// Visibility policy applied while rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Render invisible nodes with an `invisible` marker instead of skipping them
    pub is_admin: bool,
    /// Render inactive nodes instead of skipping them
    pub show_inactive: bool,
    /// Selection markers are only meaningful when checkboxes are shown
    pub show_checkbox: bool,
}

impl From<&RenderConfig> for RenderOptions {
    fn from(config: &RenderConfig) -> Self {
        Self {
            is_admin: config.is_admin,
            show_inactive: config.show_inactive,
            show_checkbox: config.show_checkbox,
        }
    }
}

impl RenderOptions {
    /// Whether `node` is emitted at all.
    pub fn includes(&self, node: &Node) -> bool {
        let flags = node.flags();
        if !self.is_admin && !flags.is_visible() {
            return false;
        }
        self.show_inactive || flags.is_active()
    }
}

/// Derived per-node attributes. Every flag is copied from the node; nothing
/// is recomputed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedNode {
    pub id: NodeId,
    pub left: u64,
    pub right: u64,
    pub depth: u32,
    pub name: String,
    pub icon: Option<String>,
    pub icon_kind: IconKind,
    /// `right != left + 1`
    pub is_parent: bool,
    /// Hidden node shown to an admin
    pub invisible: bool,
    pub readonly: bool,
    pub movable_up: bool,
    pub movable_down: bool,
    pub movable_left: bool,
    pub movable_right: bool,
    pub removable: bool,
    pub removable_all: bool,
    pub child_allowed: bool,
    pub selected: bool,
    pub collapsed: bool,
    pub disabled: bool,
    pub inactive: bool,
}

impl RenderedNode {
    pub fn project(node: &Node, options: &RenderOptions) -> Self {
        let flags = node.flags();
        Self {
            id: node.id,
            left: node.position.left,
            right: node.position.right,
            depth: node.position.depth,
            name: node.attrs.name.clone(),
            icon: node.attrs.icon.clone().filter(|icon| !icon.is_empty()),
            icon_kind: node.attrs.icon_kind,
            is_parent: node.is_parent(),
            invisible: options.is_admin && !flags.is_visible(),
            readonly: flags.is_readonly(),
            movable_up: flags.is_movable(Direction::Up),
            movable_down: flags.is_movable(Direction::Down),
            movable_left: flags.is_movable(Direction::Left),
            movable_right: flags.is_movable(Direction::Right),
            removable: flags.is_removable(),
            removable_all: flags.is_removable_all(),
            child_allowed: flags.is_child_allowed(),
            selected: options.show_checkbox && flags.is_selected(),
            collapsed: flags.is_collapsed(),
            disabled: flags.is_disabled(),
            inactive: !flags.is_active(),
        }
    }

    pub fn is_movable(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.movable_up,
            Direction::Down => self.movable_down,
            Direction::Left => self.movable_left,
            Direction::Right => self.movable_right,
        }
    }

    /// CSS markers in emission order
    pub fn css_classes(&self) -> Vec<&'static str> {
        let mut css = Vec::new();
        if self.is_parent {
            css.push("kv-parent");
        }
        if self.invisible {
            css.push("kv-invisible");
        }
        if self.selected {
            css.push("kv-selected");
        }
        if self.collapsed {
            css.push("kv-collapsed");
        }
        if self.disabled {
            css.push("kv-disabled");
        }
        if self.inactive {
            css.push("kv-inactive");
        }
        css
    }
}

/// Structural event of the rendered tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "node", rename_all = "snake_case")]
pub enum MarkupEvent {
    OpenLevel,
    OpenItem(Box<RenderedNode>),
    CloseItem,
    CloseLevel,
}

/// Renderer output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkupTree {
    /// Nothing to show
    Placeholder { message: String },
    /// Balanced event stream, starting with the outer `OpenLevel`
    Nodes(Vec<MarkupEvent>),
}

impl MarkupTree {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder { .. })
    }

    pub fn events(&self) -> &[MarkupEvent] {
        match self {
            Self::Placeholder { .. } => &[],
            Self::Nodes(events) => events,
        }
    }

    /// Emitted nodes in document order
    pub fn nodes(&self) -> impl Iterator<Item = &RenderedNode> {
        self.events().iter().filter_map(|event| match event {
            MarkupEvent::OpenItem(node) => Some(node.as_ref()),
            _ => None,
        })
    }
}

/// Open levels, innermost last; `true` when that level has an item open.
struct LevelStack {
    levels: Vec<bool>,
    events: Vec<MarkupEvent>,
}

impl LevelStack {
    fn new() -> Self {
        Self {
            levels: vec![false],
            events: vec![MarkupEvent::OpenLevel],
        }
    }

    fn current_depth(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    fn close_item(&mut self) {
        if let Some(open) = self.levels.last_mut() {
            if *open {
                *open = false;
                self.events.push(MarkupEvent::CloseItem);
            }
        }
    }

    fn close_level(&mut self) {
        self.close_item();
        if self.levels.pop().is_some() {
            self.events.push(MarkupEvent::CloseLevel);
        }
    }

    fn descend_to(&mut self, depth: usize) {
        while self.current_depth() > depth {
            self.close_level();
        }
        while self.current_depth() < depth {
            self.levels.push(false);
            self.events.push(MarkupEvent::OpenLevel);
        }
        self.close_item();
    }

    fn open_item(&mut self, node: RenderedNode) {
        self.descend_to(node.depth as usize);
        if let Some(open) = self.levels.last_mut() {
            *open = true;
        }
        self.events.push(MarkupEvent::OpenItem(Box::new(node)));
    }

    fn finish(mut self) -> Vec<MarkupEvent> {
        while !self.levels.is_empty() {
            self.close_level();
        }
        self.events
    }
}

/// Render an ordered node list.
///
/// Yields [`MarkupTree::Placeholder`] when no node survives the visibility
/// policy, never an empty nested structure.
pub fn render(nodes: &[Node], options: &RenderOptions, empty_message: &str) -> MarkupTree {
    let mut stack = LevelStack::new();
    let mut emitted = 0usize;

    for node in nodes.iter().filter(|node| options.includes(node)) {
        stack.open_item(RenderedNode::project(node, options));
        emitted += 1;
    }

    tracing::trace!(input = nodes.len(), emitted, "rendered tree");

    if emitted == 0 {
        return MarkupTree::Placeholder {
            message: empty_message.to_string(),
        };
    }
    MarkupTree::Nodes(stack.finish())
}

/// Render with options and placeholder text taken from configuration.
pub fn render_with_config(nodes: &[Node], config: &RenderConfig) -> MarkupTree {
    render(nodes, &RenderOptions::from(config), &config.empty_message)
}
