//! Client-side node arena
//!
//! The client keeps the rendered hierarchy as parent/child links keyed by
//! [`NodeKey`]. Nested-set coordinates are not tracked: after the initial
//! render the client only mirrors structural changes it has been told about.

use canopy_core::{Direction, IconKind, NodeId, ParentKey};
use canopy_render::{MarkupEvent, MarkupTree, RenderedNode};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Prefix of unsaved placeholder keys.
pub const PLACEHOLDER_PREFIX: &str = "empty-";

/// Label shown for an unsaved node
pub const PLACEHOLDER_LABEL: &str = "(new)";

/// Identity of a node in the client tree.
///
/// Placeholders stand for an unsaved node and are keyed by the parent they
/// will be created under: `empty-root` or `empty-<parent id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Node(NodeId),
    Placeholder(ParentKey),
}

impl NodeKey {
    pub fn node_id(self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(id),
            Self::Placeholder(_) => None,
        }
    }

    pub fn is_placeholder(self) -> bool {
        matches!(self, Self::Placeholder(_))
    }
}

impl From<NodeId> for NodeKey {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(id) => write!(f, "{id}"),
            Self::Placeholder(parent) => write!(f, "{PLACEHOLDER_PREFIX}{parent}"),
        }
    }
}

impl FromStr for NodeKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix(PLACEHOLDER_PREFIX) {
            Some(parent) => parent.parse().map(Self::Placeholder),
            None => s
                .parse::<NodeId>()
                .map(Self::Node)
                .map_err(|_| format!("invalid node key '{s}'")),
        }
    }
}

/// Per-node permissions copied from the rendered flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    pub movable_up: bool,
    pub movable_down: bool,
    pub movable_left: bool,
    pub movable_right: bool,
    pub removable: bool,
    pub removable_all: bool,
    pub child_allowed: bool,
}

impl Permissions {
    pub fn is_movable(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.movable_up,
            Direction::Down => self.movable_down,
            Direction::Left => self.movable_left,
            Direction::Right => self.movable_right,
        }
    }

    fn placeholder() -> Self {
        Self {
            movable_up: false,
            movable_down: false,
            movable_left: false,
            movable_right: false,
            removable: true,
            removable_all: false,
            child_allowed: false,
        }
    }
}

/// One `li` of the client tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientNode {
    pub key: NodeKey,
    pub label: String,
    pub icon: Option<String>,
    pub icon_kind: IconKind,
    pub permissions: Permissions,
    pub collapsed: bool,
    pub selected: bool,
    pub disabled: bool,
    pub inactive: bool,
    pub invisible: bool,
    pub readonly: bool,
    /// Label markup with search matches wrapped, while a search is applied
    pub highlight: Option<String>,
    /// The node or one of its descendants matched the active search
    pub filter_match: bool,
    parent_marker: bool,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
}

impl ClientNode {
    fn from_rendered(node: &RenderedNode, parent: Option<NodeKey>) -> Self {
        Self {
            key: NodeKey::Node(node.id),
            label: node.name.clone(),
            icon: node.icon.clone(),
            icon_kind: node.icon_kind,
            permissions: Permissions {
                movable_up: node.movable_up,
                movable_down: node.movable_down,
                movable_left: node.movable_left,
                movable_right: node.movable_right,
                removable: node.removable,
                removable_all: node.removable_all,
                child_allowed: node.child_allowed,
            },
            collapsed: node.collapsed,
            selected: node.selected,
            disabled: node.disabled,
            inactive: node.inactive,
            invisible: node.invisible,
            readonly: node.readonly,
            highlight: None,
            filter_match: false,
            parent_marker: node.is_parent,
            parent,
            children: Vec::new(),
        }
    }

    /// Unsaved node under `parent`
    pub fn placeholder(parent: ParentKey) -> Self {
        let parent_node = match parent {
            ParentKey::Root => None,
            ParentKey::Node(id) => Some(NodeKey::Node(id)),
        };
        Self {
            key: NodeKey::Placeholder(parent),
            label: PLACEHOLDER_LABEL.to_string(),
            icon: None,
            icon_kind: IconKind::default(),
            permissions: Permissions::placeholder(),
            collapsed: false,
            selected: false,
            disabled: false,
            inactive: false,
            invisible: false,
            readonly: false,
            highlight: None,
            filter_match: false,
            parent_marker: false,
            parent: parent_node,
            children: Vec::new(),
        }
    }

    /// Carries the parent marker (`kv-parent`)
    pub fn is_parent(&self) -> bool {
        self.parent_marker
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    pub fn is_placeholder(&self) -> bool {
        self.key.is_placeholder()
    }
}

/// The whole client hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientTree {
    nodes: HashMap<NodeKey, ClientNode>,
    roots: Vec<NodeKey>,
    empty_message: Option<String>,
}

impl ClientTree {
    /// Rebuild the hierarchy from the renderer's event stream.
    pub fn from_markup(markup: &MarkupTree) -> Self {
        let mut tree = Self::default();
        if let MarkupTree::Placeholder { message } = markup {
            tree.empty_message = Some(message.clone());
            return tree;
        }

        let mut open: Vec<NodeKey> = Vec::new();
        for event in markup.events() {
            match event {
                MarkupEvent::OpenItem(rendered) => {
                    let parent = open.last().copied();
                    let node = ClientNode::from_rendered(rendered, parent);
                    let key = node.key;
                    tree.link(key, parent, None);
                    tree.nodes.insert(key, node);
                    open.push(key);
                }
                MarkupEvent::CloseItem => {
                    open.pop();
                }
                MarkupEvent::OpenLevel | MarkupEvent::CloseLevel => {}
            }
        }
        tree
    }

    /// Placeholder message when the server had nothing to show
    pub fn empty_message(&self) -> Option<&str> {
        if self.nodes.is_empty() {
            self.empty_message.as_deref()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(&key)
    }

    pub fn get(&self, key: NodeKey) -> Option<&ClientNode> {
        self.nodes.get(&key)
    }

    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut ClientNode> {
        self.nodes.get_mut(&key)
    }

    pub fn roots(&self) -> &[NodeKey] {
        &self.roots
    }

    /// Ordered siblings of `key`, itself included.
    pub fn siblings(&self, key: NodeKey) -> &[NodeKey] {
        match self.get(key).and_then(ClientNode::parent) {
            Some(parent) => self.get(parent).map(ClientNode::children).unwrap_or_default(),
            None => &self.roots,
        }
    }

    fn sibling_index(&self, key: NodeKey) -> Option<usize> {
        self.siblings(key).iter().position(|k| *k == key)
    }

    pub fn prev_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let index = self.sibling_index(key)?;
        index.checked_sub(1).map(|i| self.siblings(key)[i])
    }

    pub fn next_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let index = self.sibling_index(key)?;
        self.siblings(key).get(index + 1).copied()
    }

    /// Ancestors from the nearest outwards.
    pub fn ancestors(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut chain = Vec::new();
        let mut cursor = self.get(key).and_then(ClientNode::parent);
        while let Some(parent) = cursor {
            chain.push(parent);
            cursor = self.get(parent).and_then(ClientNode::parent);
        }
        chain
    }

    /// Descendants of `key` in document order.
    pub fn descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        if let Some(node) = self.get(key) {
            for child in &node.children {
                self.walk(*child, &mut out);
            }
        }
        out
    }

    /// Every key in document order.
    pub fn order(&self) -> Vec<NodeKey> {
        let mut out = Vec::with_capacity(self.nodes.len());
        for root in &self.roots {
            self.walk(*root, &mut out);
        }
        out
    }

    fn walk(&self, key: NodeKey, out: &mut Vec<NodeKey>) {
        out.push(key);
        if let Some(node) = self.get(key) {
            for child in &node.children {
                self.walk(*child, out);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientNode> {
        self.nodes.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ClientNode> {
        self.nodes.values_mut()
    }

    /// Placeholder currently open under `parent`, if any
    pub fn placeholder_under(&self, parent: ParentKey) -> Option<NodeKey> {
        let key = NodeKey::Placeholder(parent);
        self.contains(key).then_some(key)
    }

    /// Attach `node` as the last child of `parent` (or last root).
    pub fn push(&mut self, node: ClientNode) {
        let key = node.key;
        let parent = node.parent;
        self.link(key, parent, None);
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.parent_marker = true;
        }
        self.nodes.insert(key, node);
    }

    /// Drop `key` and its subtree. A parent left without children loses its
    /// parent marker. Returns the removed keys.
    pub fn remove_subtree(&mut self, key: NodeKey) -> Vec<NodeKey> {
        if !self.contains(key) {
            return Vec::new();
        }
        let mut doomed = vec![key];
        doomed.extend(self.descendants(key));
        let parent = self.unlink(key);
        for gone in &doomed {
            self.nodes.remove(gone);
        }
        self.settle_parent_marker(parent);
        doomed
    }

    /// Move `key` next to `target` under the target's parent.
    pub(crate) fn place_beside(&mut self, key: NodeKey, target: NodeKey, after: bool) {
        let old_parent = self.unlink(key);
        let new_parent = self.get(target).and_then(ClientNode::parent);
        let index = self
            .siblings(target)
            .iter()
            .position(|k| *k == target)
            .map(|i| if after { i + 1 } else { i });
        self.link(key, new_parent, index);
        if let Some(node) = self.nodes.get_mut(&key) {
            node.parent = new_parent;
        }
        self.settle_parent_marker(old_parent);
    }

    /// Move `key` to the end of `parent`'s children.
    pub(crate) fn append_child(&mut self, key: NodeKey, parent: NodeKey) {
        let old_parent = self.unlink(key);
        self.link(key, Some(parent), None);
        if let Some(node) = self.nodes.get_mut(&key) {
            node.parent = Some(parent);
        }
        if let Some(parent) = self.nodes.get_mut(&parent) {
            parent.parent_marker = true;
        }
        self.settle_parent_marker(old_parent);
    }

    fn link(&mut self, key: NodeKey, parent: Option<NodeKey>, index: Option<usize>) {
        let list = match parent {
            Some(parent) => match self.nodes.get_mut(&parent) {
                Some(node) => &mut node.children,
                None => return,
            },
            None => &mut self.roots,
        };
        match index {
            Some(i) if i <= list.len() => list.insert(i, key),
            _ => list.push(key),
        }
    }

    fn unlink(&mut self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.get(key).and_then(ClientNode::parent);
        match parent.and_then(|p| self.nodes.get_mut(&p)) {
            Some(node) => node.children.retain(|k| *k != key),
            None => self.roots.retain(|k| *k != key),
        }
        parent
    }

    fn settle_parent_marker(&mut self, parent: Option<NodeKey>) {
        if let Some(node) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            if node.children.is_empty() {
                node.parent_marker = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::{Node, NodeAttributes, Position};
    use canopy_render::{render, RenderOptions};

    fn nodes(outline: &[(u32, u64, u64)]) -> Vec<Node> {
        outline
            .iter()
            .enumerate()
            .map(|(i, (depth, left, right))| Node {
                id: NodeId(i as u64 + 1),
                position: Position {
                    root_id: 1,
                    left: *left,
                    right: *right,
                    depth: *depth,
                },
                attrs: NodeAttributes::new_defaults().named(format!("n{}", i + 1)),
            })
            .collect()
    }

    fn sample() -> ClientTree {
        // 1 > (2, 3 > 4)
        let list = nodes(&[(0, 1, 8), (1, 2, 3), (1, 4, 7), (2, 5, 6)]);
        ClientTree::from_markup(&render(&list, &RenderOptions::default(), "empty"))
    }

    fn key(id: u64) -> NodeKey {
        NodeKey::Node(NodeId(id))
    }

    #[test]
    fn keys_round_trip_through_strings() {
        for text in ["7", "empty-root", "empty-12"] {
            let parsed: NodeKey = text.parse().unwrap();
            assert_eq!(parsed.to_string(), text);
        }
        assert!("empty-x".parse::<NodeKey>().is_err());
    }

    #[test]
    fn markup_rebuilds_parent_links() {
        let tree = sample();
        assert_eq!(tree.roots(), &[key(1)]);
        assert_eq!(tree.get(key(1)).unwrap().children(), &[key(2), key(3)]);
        assert_eq!(tree.ancestors(key(4)), vec![key(3), key(1)]);
        assert_eq!(tree.order(), vec![key(1), key(2), key(3), key(4)]);
        assert!(tree.get(key(3)).unwrap().is_parent());
        assert!(!tree.get(key(2)).unwrap().is_parent());
    }

    #[test]
    fn placeholder_markup_builds_empty_tree() {
        let tree = ClientTree::from_markup(&render(&[], &RenderOptions::default(), "Nothing here"));
        assert!(tree.is_empty());
        assert_eq!(tree.empty_message(), Some("Nothing here"));
    }

    #[test]
    fn sibling_navigation() {
        let tree = sample();
        assert_eq!(tree.prev_sibling(key(3)), Some(key(2)));
        assert_eq!(tree.next_sibling(key(2)), Some(key(3)));
        assert_eq!(tree.prev_sibling(key(2)), None);
        assert_eq!(tree.next_sibling(key(1)), None);
    }

    #[test]
    fn removing_last_child_clears_parent_marker() {
        let mut tree = sample();
        assert_eq!(tree.remove_subtree(key(4)), vec![key(4)]);
        assert!(!tree.get(key(3)).unwrap().is_parent());

        let removed = tree.remove_subtree(key(1));
        assert_eq!(removed.len(), 3);
        assert!(tree.is_empty());
    }

    #[test]
    fn placeholders_mark_their_parent() {
        let mut tree = sample();
        tree.push(ClientNode::placeholder(ParentKey::Node(NodeId(2))));
        assert!(tree.get(key(2)).unwrap().is_parent());
        assert_eq!(
            tree.placeholder_under(ParentKey::Node(NodeId(2))),
            Some(NodeKey::Placeholder(ParentKey::Node(NodeId(2))))
        );

        tree.push(ClientNode::placeholder(ParentKey::Root));
        assert_eq!(tree.roots().last(), Some(&NodeKey::Placeholder(ParentKey::Root)));
    }
}
