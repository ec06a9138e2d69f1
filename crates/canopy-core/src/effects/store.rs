//! Hierarchy store effect interface
//!
//! The store owns the nested-set encoding. Every mutating call persists and
//! renumbers `left/right/depth` for the affected subtree atomically; callers
//! re-read nodes after a mutation rather than trusting stale positions.

use crate::errors::StoreError;
use crate::node::{Node, NodeAttributes, NodeId};
use async_trait::async_trait;

/// Nested-set persistence collaborator.
#[async_trait]
pub trait HierarchyStore: Send + Sync {
    /// Every node ordered by `(root_id, left)` ascending
    async fn ordered_nodes(&self) -> Result<Vec<Node>, StoreError>;

    /// Look up a node
    async fn find(&self, id: NodeId) -> Result<Option<Node>, StoreError>;

    /// Look up a node that must exist
    async fn get(&self, id: NodeId) -> Result<Node, StoreError> {
        self.find(id).await?.ok_or(StoreError::NotFound { id })
    }

    /// Persist a new node as the last root
    async fn create_root(&self, attrs: NodeAttributes) -> Result<Node, StoreError>;

    /// Persist a new node as the last child of `parent`
    async fn create_child(&self, attrs: NodeAttributes, parent: NodeId)
        -> Result<Node, StoreError>;

    /// Detach an existing subtree into a new tree of its own
    async fn make_root(&self, id: NodeId) -> Result<(), StoreError>;

    /// Move a subtree to be the last child of `parent`
    async fn append_to(&self, id: NodeId, parent: NodeId) -> Result<(), StoreError>;

    /// Move a subtree to be the previous sibling of `target`
    async fn insert_before(&self, id: NodeId, target: NodeId) -> Result<(), StoreError>;

    /// Move a subtree to be the next sibling of `target`
    async fn insert_after(&self, id: NodeId, target: NodeId) -> Result<(), StoreError>;

    /// Persist attribute changes of one node
    async fn update(&self, id: NodeId, attrs: &NodeAttributes) -> Result<Node, StoreError>;

    /// Ancestors, outermost first. `depth` limits the result to the nearest
    /// `depth` levels; `None` returns the full chain.
    async fn parents(&self, id: NodeId, depth: Option<u32>) -> Result<Vec<Node>, StoreError>;

    /// Every descendant in `(root_id, left)` order
    async fn children(&self, id: NodeId) -> Result<Vec<Node>, StoreError>;

    /// Delete a single leaf node
    async fn delete(&self, id: NodeId) -> Result<(), StoreError>;

    /// Delete a node and its whole subtree, returning the number of rows removed
    async fn delete_with_descendants(&self, id: NodeId) -> Result<u64, StoreError>;
}
