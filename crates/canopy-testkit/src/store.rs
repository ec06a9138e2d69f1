//! In-memory nested-set store
//!
//! Keeps the hierarchy as ordered child lists and derives `left/right/depth`
//! on every read, so positions are always consistent after a mutation. New
//! trees get a monotonically increasing `root_id`, which places a new root
//! after every existing one in `(root_id, left)` order.

use async_lock::RwLock;
use async_trait::async_trait;
use canopy_core::{
    FieldError, HierarchyStore, Node, NodeAttributes, NodeFlag, NodeId, Position, StoreError,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Record {
    attrs: NodeAttributes,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<NodeId, Record>,
    roots: Vec<NodeId>,
    tree_ids: HashMap<NodeId, u64>,
    next_id: u64,
    next_tree: u64,
    failing_updates: HashSet<NodeId>,
    mutations: u64,
}

impl Inner {
    fn allocate_id(&mut self) -> NodeId {
        self.next_id += 1;
        NodeId(self.next_id)
    }

    fn allocate_tree(&mut self) -> u64 {
        self.next_tree += 1;
        self.next_tree
    }

    fn record(&self, id: NodeId) -> Result<&Record, StoreError> {
        self.records.get(&id).ok_or(StoreError::NotFound { id })
    }

    fn layout(&self) -> Vec<Node> {
        let mut out = Vec::with_capacity(self.records.len());
        for root in &self.roots {
            let tree = self.tree_ids.get(root).copied().unwrap_or_default();
            let mut counter = 0;
            self.visit(*root, tree, 0, &mut counter, &mut out);
        }
        out
    }

    fn visit(&self, id: NodeId, tree: u64, depth: u32, counter: &mut u64, out: &mut Vec<Node>) {
        let Some(record) = self.records.get(&id) else {
            return;
        };
        *counter += 1;
        let slot = out.len();
        out.push(Node {
            id,
            position: Position {
                root_id: tree,
                left: *counter,
                right: 0,
                depth,
            },
            attrs: record.attrs.clone(),
        });
        for child in &record.children {
            self.visit(*child, tree, depth + 1, counter, out);
        }
        *counter += 1;
        out[slot].position.right = *counter;
    }

    fn node(&self, id: NodeId) -> Result<Node, StoreError> {
        self.layout()
            .into_iter()
            .find(|node| node.id == id)
            .ok_or(StoreError::NotFound { id })
    }

    fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(record) = self.records.get(&next) {
                for child in record.children.iter().rev() {
                    out.push(*child);
                    stack.push(*child);
                }
            }
        }
        out
    }

    fn is_within(&self, candidate: NodeId, subtree: NodeId) -> bool {
        let mut cursor = Some(candidate);
        while let Some(id) = cursor {
            if id == subtree {
                return true;
            }
            cursor = self.records.get(&id).and_then(|r| r.parent);
        }
        false
    }

    fn detach(&mut self, id: NodeId) -> Result<(), StoreError> {
        let parent = self.record(id)?.parent;
        match parent {
            Some(parent) => {
                if let Some(record) = self.records.get_mut(&parent) {
                    record.children.retain(|child| *child != id);
                }
            }
            None => {
                self.roots.retain(|root| *root != id);
                self.tree_ids.remove(&id);
            }
        }
        if let Some(record) = self.records.get_mut(&id) {
            record.parent = None;
        }
        Ok(())
    }

    fn check_target(&self, id: NodeId, target: NodeId) -> Result<(), StoreError> {
        self.record(id)?;
        self.record(target)?;
        if id == target {
            return Err(StoreError::illegal_move(
                "Can not move a node when the target node is same.",
            ));
        }
        if self.is_within(target, id) {
            return Err(StoreError::illegal_move(
                "Can not move a node when the target node is child.",
            ));
        }
        Ok(())
    }

    fn attach_child(&mut self, id: NodeId, parent: NodeId, index: Option<usize>) {
        if let Some(record) = self.records.get_mut(&parent) {
            match index {
                Some(i) => record.children.insert(i.min(record.children.len()), id),
                None => record.children.push(id),
            }
        }
        if let Some(record) = self.records.get_mut(&id) {
            record.parent = Some(parent);
        }
    }

    fn insert_beside(&mut self, id: NodeId, target: NodeId, after: bool) -> Result<(), StoreError> {
        self.check_target(id, target)?;
        let parent = self.record(target)?.parent.ok_or_else(|| {
            StoreError::illegal_move("Can not move a node when the target node is root.")
        })?;
        self.detach(id)?;
        let index = self
            .record(parent)?
            .children
            .iter()
            .position(|child| *child == target)
            .unwrap_or(0);
        self.attach_child(id, parent, Some(if after { index + 1 } else { index }));
        self.mutations += 1;
        Ok(())
    }

    fn insert_record(&mut self, attrs: NodeAttributes, parent: Option<NodeId>) -> NodeId {
        let id = self.allocate_id();
        self.records.insert(
            id,
            Record {
                attrs,
                parent: None,
                children: Vec::new(),
            },
        );
        match parent {
            Some(parent) => self.attach_child(id, parent, None),
            None => {
                let tree = self.allocate_tree();
                self.roots.push(id);
                self.tree_ids.insert(id, tree);
            }
        }
        self.mutations += 1;
        id
    }
}

fn validate(attrs: &NodeAttributes) -> Result<(), StoreError> {
    if attrs.name.trim().is_empty() {
        return Err(StoreError::Validation {
            fields: vec![FieldError::new("name", "Name cannot be blank.")],
        });
    }
    Ok(())
}

/// Nested-set store held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryHierarchyStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryHierarchyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a pre-order outline of `(depth, name)` pairs.
    ///
    /// Ids are assigned 1, 2, 3, ... in outline order. A depth that jumps by
    /// more than one level is attached to the deepest open node.
    pub fn from_outline(outline: &[(u32, &str)]) -> Self {
        let mut inner = Inner::default();
        let mut open: Vec<NodeId> = Vec::new();
        for (depth, name) in outline {
            open.truncate(*depth as usize);
            let parent = open.last().copied();
            let id = inner.insert_record(NodeAttributes::new_defaults().named(*name), parent);
            open.push(id);
        }
        inner.mutations = 0;
        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    /// Set a flag on a node without counting it as a mutation.
    pub async fn set_flag(&self, id: NodeId, flag: NodeFlag, value: bool) {
        let mut inner = self.inner.write().await;
        if let Some(record) = inner.records.get_mut(&id) {
            record.attrs.flags.set(flag, value);
        }
    }

    /// Make every later `update` of `id` fail with a validation error.
    pub async fn fail_updates_for(&self, id: NodeId) {
        self.inner.write().await.failing_updates.insert(id);
    }

    /// Number of successful mutations since construction
    pub async fn mutation_count(&self) -> u64 {
        self.inner.read().await.mutations
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Direct children of a node (or the roots), in order.
    pub async fn child_ids(&self, parent: Option<NodeId>) -> Vec<NodeId> {
        let inner = self.inner.read().await;
        match parent {
            Some(id) => inner
                .records
                .get(&id)
                .map(|r| r.children.clone())
                .unwrap_or_default(),
            None => inner.roots.clone(),
        }
    }

    /// Parent of a node, `None` for roots
    pub async fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.inner.read().await.records.get(&id).and_then(|r| r.parent)
    }
}

#[async_trait]
impl HierarchyStore for MemoryHierarchyStore {
    async fn ordered_nodes(&self) -> Result<Vec<Node>, StoreError> {
        Ok(self.inner.read().await.layout())
    }

    async fn find(&self, id: NodeId) -> Result<Option<Node>, StoreError> {
        match self.inner.read().await.node(id) {
            Ok(node) => Ok(Some(node)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(other) => Err(other),
        }
    }

    async fn create_root(&self, attrs: NodeAttributes) -> Result<Node, StoreError> {
        validate(&attrs)?;
        let mut inner = self.inner.write().await;
        let id = inner.insert_record(attrs, None);
        inner.node(id)
    }

    async fn create_child(
        &self,
        attrs: NodeAttributes,
        parent: NodeId,
    ) -> Result<Node, StoreError> {
        validate(&attrs)?;
        let mut inner = self.inner.write().await;
        inner.record(parent)?;
        let id = inner.insert_record(attrs, Some(parent));
        inner.node(id)
    }

    async fn make_root(&self, id: NodeId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.record(id)?.parent.is_none() {
            return Err(StoreError::illegal_move("The node is already a root."));
        }
        inner.detach(id)?;
        let tree = inner.allocate_tree();
        inner.roots.push(id);
        inner.tree_ids.insert(id, tree);
        inner.mutations += 1;
        Ok(())
    }

    async fn append_to(&self, id: NodeId, parent: NodeId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.check_target(id, parent)?;
        inner.detach(id)?;
        inner.attach_child(id, parent, None);
        inner.mutations += 1;
        Ok(())
    }

    async fn insert_before(&self, id: NodeId, target: NodeId) -> Result<(), StoreError> {
        self.inner.write().await.insert_beside(id, target, false)
    }

    async fn insert_after(&self, id: NodeId, target: NodeId) -> Result<(), StoreError> {
        self.inner.write().await.insert_beside(id, target, true)
    }

    async fn update(&self, id: NodeId, attrs: &NodeAttributes) -> Result<Node, StoreError> {
        let mut inner = self.inner.write().await;
        inner.record(id)?;
        if inner.failing_updates.contains(&id) {
            return Err(StoreError::Validation {
                fields: vec![FieldError::new("active", "The record could not be saved.")],
            });
        }
        validate(attrs)?;
        if let Some(record) = inner.records.get_mut(&id) {
            record.attrs = attrs.clone();
        }
        inner.mutations += 1;
        inner.node(id)
    }

    async fn parents(&self, id: NodeId, depth: Option<u32>) -> Result<Vec<Node>, StoreError> {
        let inner = self.inner.read().await;
        let mut chain = Vec::new();
        let mut cursor = inner.record(id)?.parent;
        while let Some(parent) = cursor {
            chain.push(parent);
            cursor = inner.records.get(&parent).and_then(|r| r.parent);
        }
        if let Some(limit) = depth {
            chain.truncate(limit as usize);
        }
        chain.reverse();
        let layout = inner.layout();
        Ok(chain
            .into_iter()
            .filter_map(|pid| layout.iter().find(|n| n.id == pid).cloned())
            .collect())
    }

    async fn children(&self, id: NodeId) -> Result<Vec<Node>, StoreError> {
        let inner = self.inner.read().await;
        inner.record(id)?;
        let wanted: HashSet<NodeId> = inner.descendants(id).into_iter().collect();
        Ok(inner
            .layout()
            .into_iter()
            .filter(|node| wanted.contains(&node.id))
            .collect())
    }

    async fn delete(&self, id: NodeId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.record(id)?.children.is_empty() {
            return Err(StoreError::illegal_move(
                "Can not delete a node that has children.",
            ));
        }
        inner.detach(id)?;
        inner.records.remove(&id);
        inner.mutations += 1;
        Ok(())
    }

    async fn delete_with_descendants(&self, id: NodeId) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        inner.record(id)?;
        let doomed = inner.descendants(id);
        inner.detach(id)?;
        inner.records.remove(&id);
        for child in &doomed {
            inner.records.remove(child);
        }
        inner.mutations += 1;
        Ok(doomed.len() as u64 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn outline() -> MemoryHierarchyStore {
        // 1 Root
        //   2 A
        //     3 A1
        //   4 B
        // 5 Other
        MemoryHierarchyStore::from_outline(&[
            (0, "Root"),
            (1, "A"),
            (2, "A1"),
            (1, "B"),
            (0, "Other"),
        ])
    }

    #[tokio::test]
    async fn layout_is_nested_set_ordered() {
        let store = outline();
        let nodes = store.ordered_nodes().await.unwrap();
        let shape: Vec<_> = nodes
            .iter()
            .map(|n| {
                let p = n.position;
                (n.id.0, p.root_id, p.left, p.right, p.depth)
            })
            .collect();
        assert_eq!(
            shape,
            vec![
                (1, 1, 1, 8, 0),
                (2, 1, 2, 5, 1),
                (3, 1, 3, 4, 2),
                (4, 1, 6, 7, 1),
                (5, 2, 1, 2, 0),
            ]
        );
    }

    #[tokio::test]
    async fn insert_before_and_after_reorder_siblings() {
        let store = outline();
        store.insert_before(NodeId(4), NodeId(2)).await.unwrap();
        assert_eq!(store.child_ids(Some(NodeId(1))).await, vec![NodeId(4), NodeId(2)]);
        store.insert_after(NodeId(4), NodeId(2)).await.unwrap();
        assert_eq!(store.child_ids(Some(NodeId(1))).await, vec![NodeId(2), NodeId(4)]);
    }

    #[tokio::test]
    async fn root_targets_and_own_subtree_are_illegal() {
        let store = outline();
        assert_matches!(
            store.insert_after(NodeId(5), NodeId(1)).await,
            Err(StoreError::IllegalMove { .. })
        );
        assert_matches!(
            store.append_to(NodeId(1), NodeId(3)).await,
            Err(StoreError::IllegalMove { .. })
        );
        assert_eq!(store.mutation_count().await, 0);
    }

    #[tokio::test]
    async fn make_root_goes_last() {
        let store = outline();
        store.make_root(NodeId(2)).await.unwrap();
        assert_eq!(store.child_ids(None).await, vec![NodeId(1), NodeId(5), NodeId(2)]);
        let moved = store.get(NodeId(3)).await.unwrap();
        assert_eq!(moved.position.depth, 1);
    }

    #[tokio::test]
    async fn parents_and_children_queries() {
        let store = outline();
        let parents = store.parents(NodeId(3), None).await.unwrap();
        assert_eq!(parents.iter().map(|n| n.id).collect::<Vec<_>>(), vec![NodeId(1), NodeId(2)]);
        let nearest = store.parents(NodeId(3), Some(1)).await.unwrap();
        assert_eq!(nearest.iter().map(|n| n.id).collect::<Vec<_>>(), vec![NodeId(2)]);
        let children = store.children(NodeId(1)).await.unwrap();
        assert_eq!(
            children.iter().map(|n| n.id).collect::<Vec<_>>(),
            vec![NodeId(2), NodeId(3), NodeId(4)]
        );
    }

    #[tokio::test]
    async fn delete_requires_leaf_unless_cascading() {
        let store = outline();
        assert_matches!(store.delete(NodeId(2)).await, Err(StoreError::IllegalMove { .. }));
        assert_eq!(store.delete_with_descendants(NodeId(2)).await.unwrap(), 2);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn blank_name_and_injected_failures_are_rejected() {
        let store = outline();
        let err = store.create_root(NodeAttributes::default()).await.unwrap_err();
        assert_matches!(err, StoreError::Validation { .. });

        store.fail_updates_for(NodeId(4)).await;
        let attrs = store.get(NodeId(4)).await.unwrap().attrs;
        assert_matches!(store.update(NodeId(4), &attrs).await, Err(StoreError::Validation { .. }));
    }
}
