//! Pure transitions on the client tree
//!
//! Nothing here talks to the server or raises events. The controller decides
//! when to call these; tests drive them directly.

use crate::error::{ClientError, Result};
use crate::tree::{ClientNode, ClientTree, NodeKey};
use canopy_core::{Direction, NodeId};
use canopy_render::escape;

/// CSS class wrapped around each search match.
pub const SEARCH_FOUND_CSS: &str = "kv-search-found";

// ---------------------------------------------------------------------------
// Moves
// ---------------------------------------------------------------------------

/// A move resolved against the local tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovePlan {
    pub direction: Direction,
    pub from: NodeId,
    /// Anchor node sent to the server as `id_to`
    pub to: NodeId,
}

fn direction_name(direction: Direction) -> &'static str {
    match direction {
        Direction::Up => "up",
        Direction::Down => "down",
        Direction::Left => "left",
        Direction::Right => "right",
    }
}

/// Resolve the anchor of a move.
///
/// | dir | anchor |
/// |-----|--------|
/// | u | previous sibling |
/// | d | next sibling |
/// | l | parent, or the last root when the parent is a root |
/// | r | previous sibling |
pub fn plan_move(tree: &ClientTree, key: NodeKey, direction: Direction) -> Result<MovePlan> {
    let node = tree.get(key).ok_or(ClientError::UnknownNode { key })?;
    let from = key.node_id().ok_or(ClientError::UnsavedMove { key })?;
    if node.disabled {
        return Err(ClientError::Disabled { key });
    }
    if !node.permissions.is_movable(direction) {
        return Err(ClientError::NotMovable {
            key,
            direction: direction_name(direction),
        });
    }

    let anchor = match direction {
        Direction::Up => tree.prev_sibling(key).ok_or(ClientError::AtTop)?,
        Direction::Down => tree.next_sibling(key).ok_or(ClientError::AtBottom)?,
        Direction::Right => tree.prev_sibling(key).ok_or(ClientError::AtRightmost)?,
        Direction::Left => {
            let parent = node.parent().ok_or(ClientError::AtLeftmost)?;
            let parent_is_root = tree.get(parent).and_then(ClientNode::parent).is_none();
            if parent_is_root {
                tree.roots().last().copied().ok_or(ClientError::AtLeftmost)?
            } else {
                parent
            }
        }
    };
    let to = anchor
        .node_id()
        .ok_or(ClientError::UnsavedMove { key: anchor })?;

    Ok(MovePlan {
        direction,
        from,
        to,
    })
}

/// Mirror a server-accepted move locally, then expand every collapsed
/// ancestor of the moved node.
pub fn apply_move(tree: &mut ClientTree, plan: &MovePlan) {
    let from = NodeKey::Node(plan.from);
    let to = NodeKey::Node(plan.to);
    match plan.direction {
        Direction::Up => tree.place_beside(from, to, false),
        Direction::Down | Direction::Left => tree.place_beside(from, to, true),
        Direction::Right => tree.append_child(from, to),
    }
    expand_ancestors(tree, from);
}

// ---------------------------------------------------------------------------
// Expand / collapse
// ---------------------------------------------------------------------------

pub fn expand_ancestors(tree: &mut ClientTree, key: NodeKey) {
    for ancestor in tree.ancestors(key) {
        if let Some(node) = tree.get_mut(ancestor) {
            node.collapsed = false;
        }
    }
}

/// Collapse or expand every parent.
pub fn set_all_collapsed(tree: &mut ClientTree, collapsed: bool) {
    for node in tree.iter_mut() {
        if node.is_parent() {
            node.collapsed = collapsed;
        } else if !collapsed {
            node.collapsed = false;
        }
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Result of applying a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Nodes whose label matched, in document order
    pub matches: Vec<NodeKey>,
    /// Non-matching nodes should be hidden
    pub active_filter: bool,
}

fn chars_match(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Byte ranges of non-overlapping, case-insensitive literal matches.
fn find_matches(text: &str, query: &str) -> Vec<(usize, usize)> {
    let needle: Vec<char> = query.chars().collect();
    if needle.is_empty() {
        return Vec::new();
    }
    let hay: Vec<(usize, char)> = text.char_indices().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i + needle.len() <= hay.len() {
        let hit = needle
            .iter()
            .zip(&hay[i..])
            .all(|(n, (_, h))| chars_match(*n, *h));
        if hit {
            let start = hay[i].0;
            let end = hay
                .get(i + needle.len())
                .map_or(text.len(), |(offset, _)| *offset);
            out.push((start, end));
            i += needle.len();
        } else {
            i += 1;
        }
    }
    out
}

/// Label markup with every match of `query` wrapped, or `None` on no match.
pub fn highlight(label: &str, query: &str) -> Option<String> {
    let ranges = find_matches(label, query);
    if ranges.is_empty() {
        return None;
    }
    let mut out = String::with_capacity(label.len() + ranges.len() * 32);
    let mut cursor = 0;
    for (start, end) in ranges {
        out.push_str(&escape(&label[cursor..start]));
        out.push_str(&format!(
            "<span class=\"{SEARCH_FOUND_CSS}\">{}</span>",
            escape(&label[start..end])
        ));
        cursor = end;
    }
    out.push_str(&escape(&label[cursor..]));
    Some(out)
}

/// Remove match markup and filter marks.
pub fn clear_search(tree: &mut ClientTree) {
    for node in tree.iter_mut() {
        node.highlight = None;
        node.filter_match = false;
    }
}

/// Collapse the tree, then open only the ancestor chains of matching labels.
///
/// An empty query clears previous results and expands everything.
pub fn apply_search(tree: &mut ClientTree, query: &str, hide_unmatched: bool) -> SearchOutcome {
    clear_search(tree);
    if query.is_empty() {
        set_all_collapsed(tree, false);
        return SearchOutcome::default();
    }

    set_all_collapsed(tree, true);
    let mut matches = Vec::new();
    for key in tree.order() {
        let marked = tree
            .get(key)
            .and_then(|node| highlight(&node.label, query));
        if let Some(markup) = marked {
            if let Some(node) = tree.get_mut(key) {
                node.highlight = Some(markup);
                node.filter_match = true;
            }
            for ancestor in tree.ancestors(key) {
                if let Some(node) = tree.get_mut(ancestor) {
                    node.collapsed = false;
                    node.filter_match = true;
                }
            }
            matches.push(key);
        }
    }

    SearchOutcome {
        matches,
        active_filter: hide_unmatched,
    }
}

// ---------------------------------------------------------------------------
// Toolbar
// ---------------------------------------------------------------------------

/// Enablement of each toolbar button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toolbar {
    pub create: bool,
    pub create_root: bool,
    pub remove: bool,
    pub move_up: bool,
    pub move_down: bool,
    pub move_left: bool,
    pub move_right: bool,
}

impl Toolbar {
    /// Everything off except create-root
    pub fn disabled() -> Self {
        Self {
            create: false,
            create_root: true,
            remove: false,
            move_up: false,
            move_down: false,
            move_left: false,
            move_right: false,
        }
    }

    pub fn can_move(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.move_up,
            Direction::Down => self.move_down,
            Direction::Left => self.move_left,
            Direction::Right => self.move_right,
        }
    }
}

/// Buttons for the focused node. `busy` marks a node with a request in flight.
pub fn toolbar_for(node: Option<&ClientNode>, soft_delete: bool, busy: bool) -> Toolbar {
    let Some(node) = node else {
        return Toolbar::disabled();
    };
    if node.disabled || busy {
        return Toolbar::disabled();
    }
    let perms = &node.permissions;
    let trash_blocked = !perms.removable
        || (node.inactive && soft_delete)
        || (!perms.removable_all && node.is_parent());
    Toolbar {
        create: perms.child_allowed,
        create_root: true,
        remove: !trash_blocked,
        move_up: perms.movable_up,
        move_down: perms.movable_down,
        move_left: perms.movable_left,
        move_right: perms.movable_right,
    }
}

// ---------------------------------------------------------------------------
// Remove
// ---------------------------------------------------------------------------

/// Local reconciliation after a successful remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveReconcile {
    /// Keep the node, marked inactive
    MarkInactive,
    /// Drop the node and its subtree
    Drop,
}

impl RemoveReconcile {
    /// Soft deletes stay visible to admins and when inactive nodes are shown.
    pub fn for_mode(is_admin: bool, show_inactive: bool, soft_delete: bool) -> Self {
        if (is_admin || show_inactive) && soft_delete {
            Self::MarkInactive
        } else {
            Self::Drop
        }
    }
}

/// Apply a successful remove of `key`. Returns the keys that changed.
pub fn apply_remove(
    tree: &mut ClientTree,
    key: NodeKey,
    reconcile: RemoveReconcile,
) -> Vec<NodeKey> {
    match reconcile {
        RemoveReconcile::Drop => tree.remove_subtree(key),
        RemoveReconcile::MarkInactive => {
            let Some(node) = tree.get_mut(key) else {
                return Vec::new();
            };
            node.inactive = true;
            let cascade = node.permissions.removable_all;
            let mut touched = vec![key];
            if cascade {
                for child in tree.descendants(key) {
                    if let Some(node) = tree.get_mut(child) {
                        node.inactive = true;
                        touched.push(child);
                    }
                }
            }
            touched
        }
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Value written to the bound form field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionValue {
    /// Comma-joined keys in document order
    pub keys: String,
    /// Comma-joined labels in the same order
    pub description: String,
}

impl SelectionValue {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Parsed keys, skipping anything malformed
    pub fn key_list(&self) -> Vec<NodeKey> {
        self.keys
            .split(',')
            .filter(|part| !part.is_empty())
            .filter_map(|part| part.parse().ok())
            .collect()
    }
}

/// Current selection collected from the tree.
pub fn selection_value(tree: &ClientTree) -> SelectionValue {
    let (keys, labels): (Vec<String>, Vec<String>) = tree
        .order()
        .into_iter()
        .filter_map(|key| tree.get(key))
        .filter(|node| node.selected)
        .map(|node| (node.key.to_string(), node.label.clone()))
        .unzip();
    SelectionValue {
        keys: keys.join(","),
        description: labels.join(","),
    }
}

/// Set `selected` on each key that is not disabled.
pub fn set_selected<I>(tree: &mut ClientTree, keys: I, selected: bool)
where
    I: IntoIterator<Item = NodeKey>,
{
    for key in keys {
        if let Some(node) = tree.get_mut(key) {
            if !node.disabled {
                node.selected = selected;
            }
        }
    }
}

/// Deselect every node that is not disabled.
pub fn clear_selection(tree: &mut ClientTree) {
    let all = tree.order();
    set_selected(tree, all, false);
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::{Node, NodeAttributes, NodeFlag, Position};
    use canopy_render::{render, RenderOptions};

    /// Electronics(1) > [Phones(2), Laptops(3) > Ultrabooks(4), Tablets(5)]; Books(6)
    fn catalog() -> ClientTree {
        let rows: [(u32, u64, u64, u64, &str); 6] = [
            (0, 1, 1, 10, "Electronics"),
            (1, 1, 2, 3, "Phones"),
            (1, 1, 4, 7, "Laptops"),
            (2, 1, 5, 6, "Ultrabooks"),
            (1, 1, 8, 9, "Tablets"),
            (0, 2, 1, 2, "Books"),
        ];
        let nodes: Vec<Node> = rows
            .iter()
            .enumerate()
            .map(|(i, (depth, root_id, left, right, name))| Node {
                id: NodeId(i as u64 + 1),
                position: Position {
                    root_id: *root_id,
                    left: *left,
                    right: *right,
                    depth: *depth,
                },
                attrs: NodeAttributes::new_defaults().named(*name),
            })
            .collect();
        ClientTree::from_markup(&render(&nodes, &RenderOptions::default(), "empty"))
    }

    fn key(id: u64) -> NodeKey {
        NodeKey::Node(NodeId(id))
    }

    fn children(tree: &ClientTree, id: u64) -> Vec<NodeKey> {
        tree.get(key(id)).unwrap().children().to_vec()
    }

    #[test]
    fn plan_rejects_edges() {
        let tree = catalog();
        assert_eq!(plan_move(&tree, key(2), Direction::Up), Err(ClientError::AtTop));
        assert_eq!(plan_move(&tree, key(5), Direction::Down), Err(ClientError::AtBottom));
        assert_eq!(plan_move(&tree, key(2), Direction::Right), Err(ClientError::AtRightmost));
        assert_eq!(plan_move(&tree, key(1), Direction::Left), Err(ClientError::AtLeftmost));
    }

    #[test]
    fn left_from_depth_one_targets_last_root() {
        let tree = catalog();
        let plan = plan_move(&tree, key(2), Direction::Left).unwrap();
        assert_eq!(plan.to, NodeId(6));

        let plan = plan_move(&tree, key(4), Direction::Left).unwrap();
        assert_eq!(plan.to, NodeId(3));
    }

    #[test]
    fn moves_mirror_server_semantics() {
        let mut tree = catalog();

        let up = plan_move(&tree, key(5), Direction::Up).unwrap();
        apply_move(&mut tree, &up);
        assert_eq!(children(&tree, 1), vec![key(2), key(5), key(3)]);

        let right = plan_move(&tree, key(5), Direction::Right).unwrap();
        assert_eq!(right.to, NodeId(2));
        apply_move(&mut tree, &right);
        assert_eq!(children(&tree, 2), vec![key(5)]);
        assert!(tree.get(key(2)).unwrap().is_parent());

        let left = plan_move(&tree, key(5), Direction::Left).unwrap();
        apply_move(&mut tree, &left);
        assert_eq!(children(&tree, 1), vec![key(2), key(5), key(3)]);
        assert!(!tree.get(key(2)).unwrap().is_parent());

        let promote = plan_move(&tree, key(3), Direction::Left).unwrap();
        apply_move(&mut tree, &promote);
        assert_eq!(tree.roots(), &[key(1), key(6), key(3)]);
        assert_eq!(tree.descendants(key(3)), vec![key(4)]);
    }

    #[test]
    fn move_expands_collapsed_ancestors() {
        let mut tree = catalog();
        set_all_collapsed(&mut tree, true);
        let plan = plan_move(&tree, key(5), Direction::Right).unwrap();
        apply_move(&mut tree, &plan);
        assert!(!tree.get(key(3)).unwrap().collapsed);
        assert!(!tree.get(key(1)).unwrap().collapsed);
    }

    #[test]
    fn immovable_and_placeholder_are_refused() {
        let mut tree = catalog();
        tree.get_mut(key(5)).unwrap().permissions.movable_up = false;
        assert_eq!(
            plan_move(&tree, key(5), Direction::Up),
            Err(ClientError::NotMovable { key: key(5), direction: "up" })
        );

        tree.push(ClientNode::placeholder(canopy_core::ParentKey::Node(NodeId(1))));
        let placeholder = NodeKey::Placeholder(canopy_core::ParentKey::Node(NodeId(1)));
        assert_eq!(
            plan_move(&tree, placeholder, Direction::Up),
            Err(ClientError::UnsavedMove { key: placeholder })
        );
    }

    #[test]
    fn highlight_wraps_every_case_insensitive_match() {
        assert_eq!(
            highlight("Tablet tab", "TAB").unwrap(),
            "<span class=\"kv-search-found\">Tab</span>let \
             <span class=\"kv-search-found\">tab</span>"
        );
        assert_eq!(highlight("Phones", "x"), None);
        assert_eq!(
            highlight("a+b (c)", "+b (").unwrap(),
            "a<span class=\"kv-search-found\">+b (</span>c)"
        );
    }

    #[test]
    fn search_expands_only_matching_chains() {
        let mut tree = catalog();
        let outcome = apply_search(&mut tree, "ultra", true);
        assert_eq!(outcome.matches, vec![key(4)]);
        assert!(outcome.active_filter);

        for id in [1, 3, 4] {
            assert!(tree.get(key(id)).unwrap().filter_match, "node {id}");
        }
        assert!(!tree.get(key(2)).unwrap().filter_match);
        assert!(!tree.get(key(1)).unwrap().collapsed);
        assert!(!tree.get(key(3)).unwrap().collapsed);

        let cleared = apply_search(&mut tree, "", true);
        assert!(cleared.matches.is_empty());
        assert!(tree.iter().all(|n| n.highlight.is_none() && !n.filter_match && !n.collapsed));
    }

    #[test]
    fn toolbar_follows_flags() {
        let mut tree = catalog();
        assert_eq!(toolbar_for(None, true, false), Toolbar::disabled());

        let leaf = toolbar_for(tree.get(key(2)), true, false);
        assert!(leaf.remove && leaf.create && leaf.move_up);

        // Parent without cascade permission cannot be trashed.
        assert!(!toolbar_for(tree.get(key(3)), true, false).remove);

        let node = tree.get_mut(key(2)).unwrap();
        node.inactive = true;
        node.permissions.child_allowed = false;
        node.permissions.movable_left = false;
        let bar = toolbar_for(tree.get(key(2)), true, false);
        assert!(!bar.remove && !bar.create && !bar.move_left && bar.move_right);
        assert!(toolbar_for(tree.get(key(2)), false, false).remove);

        tree.get_mut(key(2)).unwrap().disabled = true;
        assert_eq!(toolbar_for(tree.get(key(2)), true, false), Toolbar::disabled());
        assert_eq!(toolbar_for(tree.get(key(5)), true, true), Toolbar::disabled());
    }

    #[test]
    fn remove_reconciliation_modes() {
        let mut tree = catalog();
        tree.get_mut(key(3)).unwrap().permissions.removable_all = true;
        let touched = apply_remove(&mut tree, key(3), RemoveReconcile::for_mode(true, false, true));
        assert_eq!(touched, vec![key(3), key(4)]);
        assert!(tree.get(key(4)).unwrap().inactive);

        let dropped =
            apply_remove(&mut tree, key(3), RemoveReconcile::for_mode(false, false, true));
        assert_eq!(dropped, vec![key(3), key(4)]);
        assert!(!tree.contains(key(4)));
        assert_eq!(RemoveReconcile::for_mode(true, true, false), RemoveReconcile::Drop);
    }

    #[test]
    fn selection_skips_disabled_nodes() {
        let mut tree = catalog();
        tree.get_mut(key(3)).unwrap().disabled = true;
        set_selected(&mut tree, [key(1), key(3), key(4)], true);
        let value = selection_value(&tree);
        assert_eq!(value.keys, "1,4");
        assert_eq!(value.description, "Electronics,Ultrabooks");
        assert_eq!(value.key_list(), vec![key(1), key(4)]);

        clear_selection(&mut tree);
        assert!(selection_value(&tree).is_empty());
    }

    #[test]
    fn disabled_flag_from_markup_is_respected() {
        let attrs = NodeAttributes::new_defaults()
            .named("Locked")
            .with_flag(NodeFlag::Disabled, true);
        let node = Node {
            id: NodeId(9),
            position: Position { root_id: 1, left: 1, right: 2, depth: 0 },
            attrs,
        };
        let tree = ClientTree::from_markup(&render(&[node], &RenderOptions::default(), ""));
        assert_eq!(
            plan_move(&tree, key(9), Direction::Down),
            Err(ClientError::Disabled { key: key(9) })
        );
    }
}
