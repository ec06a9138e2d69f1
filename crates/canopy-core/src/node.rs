//! Node model
//!
//! A node is one hierarchical record. Its positional encoding (`root_id`,
//! `left`, `right`, `depth`) is owned by the hierarchy store and is read-only
//! here. Behaviour flags are stored as optional booleans so that an unset flag
//! resolves to the policy default instead of `false`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque node identifier assigned by the hierarchy store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Raw numeric value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(NodeId)
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        NodeId(value)
    }
}

/// Nested-set coordinates of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// Identifier of the tree this node belongs to
    pub root_id: u64,
    /// Left boundary
    pub left: u64,
    /// Right boundary
    pub right: u64,
    /// Nesting level, zero for roots
    pub depth: u32,
}

impl Position {
    /// A node whose `right = left + 1` has no descendants.
    pub fn is_leaf(&self) -> bool {
        self.right == self.left + 1
    }

    /// Roots live at depth zero.
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    /// Number of descendants encoded by the boundaries.
    pub fn descendant_count(&self) -> u64 {
        self.right.saturating_sub(self.left + 1) / 2
    }

    /// Whether `other` lies strictly inside this node's subtree.
    pub fn contains(&self, other: &Position) -> bool {
        self.root_id == other.root_id && self.left < other.left && other.right < self.right
    }
}

/// How a node's `icon` value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconKind {
    /// `icon` is a CSS class suffix appended to the configured icon prefix
    #[default]
    CssSuffix,
    /// `icon` is markup emitted verbatim
    RawMarkup,
}

/// Move directions accepted by the move action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Reorder before the previous sibling
    #[serde(rename = "u")]
    Up,
    /// Reorder after the next sibling
    #[serde(rename = "d")]
    Down,
    /// Promote to a sibling of the current parent
    #[serde(rename = "l")]
    Left,
    /// Demote to the last child of the previous sibling
    #[serde(rename = "r")]
    Right,
}

impl Direction {
    /// All directions in toolbar order
    pub const ALL: [Direction; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Single-letter wire code
    pub fn code(self) -> char {
        match self {
            Self::Up => 'u',
            Self::Down => 'd',
            Self::Left => 'l',
            Self::Right => 'r',
        }
    }

    /// The direction that undoes this one when nothing else changed in between
    pub fn inverse(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Per-direction movability flag
    pub fn flag(self) -> NodeFlag {
        match self {
            Self::Up => NodeFlag::MovableUp,
            Self::Down => NodeFlag::MovableDown,
            Self::Left => NodeFlag::MovableLeft,
            Self::Right => NodeFlag::MovableRight,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "u" | "up" => Ok(Self::Up),
            "d" | "down" => Ok(Self::Down),
            "l" | "left" => Ok(Self::Left),
            "r" | "right" => Ok(Self::Right),
            other => Err(format!("invalid move direction '{other}'")),
        }
    }
}

/// Boolean behaviour flags carried by every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeFlag {
    Active,
    Selected,
    Disabled,
    Readonly,
    Visible,
    Collapsed,
    MovableUp,
    MovableDown,
    MovableLeft,
    MovableRight,
    Removable,
    RemovableAll,
    ChildAllowed,
}

impl NodeFlag {
    /// Every flag, in persistence order
    pub const ALL: [NodeFlag; 13] = [
        Self::Active,
        Self::Selected,
        Self::Disabled,
        Self::Readonly,
        Self::Visible,
        Self::Collapsed,
        Self::MovableUp,
        Self::MovableDown,
        Self::MovableLeft,
        Self::MovableRight,
        Self::Removable,
        Self::RemovableAll,
        Self::ChildAllowed,
    ];

    /// Policy default applied when the flag is unset.
    pub fn default_value(self) -> bool {
        !matches!(
            self,
            Self::Selected | Self::Disabled | Self::Readonly | Self::Collapsed | Self::RemovableAll
        )
    }

    /// Persisted attribute name
    pub fn attribute(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Selected => "selected",
            Self::Disabled => "disabled",
            Self::Readonly => "readonly",
            Self::Visible => "visible",
            Self::Collapsed => "collapsed",
            Self::MovableUp => "movable_u",
            Self::MovableDown => "movable_d",
            Self::MovableLeft => "movable_l",
            Self::MovableRight => "movable_r",
            Self::Removable => "removable",
            Self::RemovableAll => "removable_all",
            Self::ChildAllowed => "child_allowed",
        }
    }
}

/// Flag storage. `None` means "unset, use the policy default".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeFlags {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readonly: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,
    #[serde(rename = "movable_u", skip_serializing_if = "Option::is_none")]
    pub movable_up: Option<bool>,
    #[serde(rename = "movable_d", skip_serializing_if = "Option::is_none")]
    pub movable_down: Option<bool>,
    #[serde(rename = "movable_l", skip_serializing_if = "Option::is_none")]
    pub movable_left: Option<bool>,
    #[serde(rename = "movable_r", skip_serializing_if = "Option::is_none")]
    pub movable_right: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removable: Option<bool>,
    #[serde(rename = "removable_all", skip_serializing_if = "Option::is_none")]
    pub removable_all: Option<bool>,
    #[serde(rename = "child_allowed", skip_serializing_if = "Option::is_none")]
    pub child_allowed: Option<bool>,
}

impl NodeFlags {
    fn slot(&self, flag: NodeFlag) -> &Option<bool> {
        match flag {
            NodeFlag::Active => &self.active,
            NodeFlag::Selected => &self.selected,
            NodeFlag::Disabled => &self.disabled,
            NodeFlag::Readonly => &self.readonly,
            NodeFlag::Visible => &self.visible,
            NodeFlag::Collapsed => &self.collapsed,
            NodeFlag::MovableUp => &self.movable_up,
            NodeFlag::MovableDown => &self.movable_down,
            NodeFlag::MovableLeft => &self.movable_left,
            NodeFlag::MovableRight => &self.movable_right,
            NodeFlag::Removable => &self.removable,
            NodeFlag::RemovableAll => &self.removable_all,
            NodeFlag::ChildAllowed => &self.child_allowed,
        }
    }

    fn slot_mut(&mut self, flag: NodeFlag) -> &mut Option<bool> {
        match flag {
            NodeFlag::Active => &mut self.active,
            NodeFlag::Selected => &mut self.selected,
            NodeFlag::Disabled => &mut self.disabled,
            NodeFlag::Readonly => &mut self.readonly,
            NodeFlag::Visible => &mut self.visible,
            NodeFlag::Collapsed => &mut self.collapsed,
            NodeFlag::MovableUp => &mut self.movable_up,
            NodeFlag::MovableDown => &mut self.movable_down,
            NodeFlag::MovableLeft => &mut self.movable_left,
            NodeFlag::MovableRight => &mut self.movable_right,
            NodeFlag::Removable => &mut self.removable,
            NodeFlag::RemovableAll => &mut self.removable_all,
            NodeFlag::ChildAllowed => &mut self.child_allowed,
        }
    }

    /// Raw stored value, `None` when unset
    pub fn raw(&self, flag: NodeFlag) -> Option<bool> {
        *self.slot(flag)
    }

    /// Stored value or the policy default
    pub fn get(&self, flag: NodeFlag) -> bool {
        self.raw(flag).unwrap_or_else(|| flag.default_value())
    }

    /// Store an explicit value
    pub fn set(&mut self, flag: NodeFlag, value: bool) {
        *self.slot_mut(flag) = Some(value);
    }

    /// Builder form of [`NodeFlags::set`]
    pub fn with(mut self, flag: NodeFlag, value: bool) -> Self {
        self.set(flag, value);
        self
    }

    /// Materialise the policy default into every unset flag.
    pub fn init_defaults(&mut self) {
        for flag in NodeFlag::ALL {
            let slot = self.slot_mut(flag);
            if slot.is_none() {
                *slot = Some(flag.default_value());
            }
        }
    }

    /// Overlay every explicitly set flag of `other` onto `self`.
    pub fn merge(&mut self, other: &NodeFlags) {
        for flag in NodeFlag::ALL {
            if let Some(value) = other.raw(flag) {
                self.set(flag, value);
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.get(NodeFlag::Active)
    }

    pub fn is_selected(&self) -> bool {
        self.get(NodeFlag::Selected)
    }

    pub fn is_disabled(&self) -> bool {
        self.get(NodeFlag::Disabled)
    }

    pub fn is_readonly(&self) -> bool {
        self.get(NodeFlag::Readonly)
    }

    pub fn is_visible(&self) -> bool {
        self.get(NodeFlag::Visible)
    }

    pub fn is_collapsed(&self) -> bool {
        self.get(NodeFlag::Collapsed)
    }

    pub fn is_movable(&self, direction: Direction) -> bool {
        self.get(direction.flag())
    }

    pub fn is_removable(&self) -> bool {
        self.get(NodeFlag::Removable)
    }

    pub fn is_removable_all(&self) -> bool {
        self.get(NodeFlag::RemovableAll)
    }

    pub fn is_child_allowed(&self) -> bool {
        self.get(NodeFlag::ChildAllowed)
    }
}

/// Editable attributes of a node (everything except identity and position).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeAttributes {
    /// Display label
    pub name: String,
    /// Icon value, interpreted per `icon_kind`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub icon_kind: IconKind,
    #[serde(flatten)]
    pub flags: NodeFlags,
}

impl NodeAttributes {
    /// Attributes for a brand-new node with every policy default materialised
    pub fn new_defaults() -> Self {
        let mut attrs = Self::default();
        attrs.flags.init_defaults();
        attrs
    }

    /// Set the display name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set a flag
    pub fn with_flag(mut self, flag: NodeFlag, value: bool) -> Self {
        self.flags.set(flag, value);
        self
    }
}

/// A persisted node as returned by the hierarchy store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(flatten)]
    pub position: Position,
    #[serde(flatten)]
    pub attrs: NodeAttributes,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.attrs.name
    }

    pub fn flags(&self) -> &NodeFlags {
        &self.attrs.flags
    }

    pub fn depth(&self) -> u32 {
        self.position.depth
    }

    pub fn is_leaf(&self) -> bool {
        self.position.is_leaf()
    }

    pub fn is_root(&self) -> bool {
        self.position.is_root()
    }

    /// Any node with descendants counts as a parent for UI purposes,
    /// regardless of `removable_all`.
    pub fn is_parent(&self) -> bool {
        !self.is_leaf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_flags_resolve_to_policy_defaults() {
        let flags = NodeFlags::default();
        assert!(flags.is_active());
        assert!(flags.is_visible());
        assert!(flags.is_removable());
        assert!(flags.is_child_allowed());
        assert!(Direction::ALL.iter().all(|d| flags.is_movable(*d)));
        assert!(!flags.is_selected());
        assert!(!flags.is_disabled());
        assert!(!flags.is_readonly());
        assert!(!flags.is_collapsed());
        assert!(!flags.is_removable_all());
    }

    #[test]
    fn init_defaults_keeps_explicit_values() {
        let mut flags = NodeFlags::default().with(NodeFlag::Active, false);
        flags.init_defaults();
        assert_eq!(flags.raw(NodeFlag::Active), Some(false));
        assert_eq!(flags.raw(NodeFlag::Visible), Some(true));
        assert_eq!(flags.raw(NodeFlag::RemovableAll), Some(false));
    }

    #[test]
    fn leaf_and_parent_follow_boundaries() {
        let leaf = Position { root_id: 1, left: 2, right: 3, depth: 1 };
        let parent = Position { root_id: 1, left: 1, right: 6, depth: 0 };
        assert!(leaf.is_leaf());
        assert!(!parent.is_leaf());
        assert_eq!(parent.descendant_count(), 2);
        assert!(parent.contains(&leaf));
        assert!(!leaf.contains(&parent));
    }

    #[test]
    fn flags_serialize_with_persisted_names() {
        let flags = NodeFlags::default().with(NodeFlag::MovableLeft, false);
        let json = serde_json::to_string(&flags).unwrap();
        assert_eq!(json, r#"{"movable_l":false}"#);
    }

    #[test]
    fn direction_codes_round_trip_through_from_str() {
        for dir in Direction::ALL {
            assert_eq!(dir.code().to_string().parse::<Direction>().unwrap(), dir);
            assert_eq!(dir.inverse().inverse(), dir);
        }
        assert!("x".parse::<Direction>().is_err());
    }
}
