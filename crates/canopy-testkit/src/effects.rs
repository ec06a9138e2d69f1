//! Combined host effects for service tests

use async_trait::async_trait;
use canopy_core::{HierarchyStore, Node, NodeAttributes, NodeId, SessionEffects, StoreError};

use crate::session::MemorySession;
use crate::store::MemoryHierarchyStore;

/// Store plus session, the pair every node action needs.
#[derive(Debug, Clone, Default)]
pub struct TestEffects {
    pub store: MemoryHierarchyStore,
    pub session: MemorySession,
}

impl TestEffects {
    pub fn new(store: MemoryHierarchyStore) -> Self {
        Self {
            store,
            session: MemorySession::new(),
        }
    }

    /// Same store, no session
    pub fn sessionless(store: MemoryHierarchyStore) -> Self {
        Self {
            store,
            session: MemorySession::detached(),
        }
    }
}

#[async_trait]
impl SessionEffects for TestEffects {
    fn is_available(&self) -> bool {
        self.session.is_available()
    }

    async fn session_get(&self, key: &str) -> Option<String> {
        self.session.session_get(key).await
    }

    async fn session_set(&self, key: &str, value: String) {
        self.session.session_set(key, value).await;
    }
}

#[async_trait]
impl HierarchyStore for TestEffects {
    async fn ordered_nodes(&self) -> Result<Vec<Node>, StoreError> {
        self.store.ordered_nodes().await
    }

    async fn find(&self, id: NodeId) -> Result<Option<Node>, StoreError> {
        self.store.find(id).await
    }

    async fn create_root(&self, attrs: NodeAttributes) -> Result<Node, StoreError> {
        self.store.create_root(attrs).await
    }

    async fn create_child(
        &self,
        attrs: NodeAttributes,
        parent: NodeId,
    ) -> Result<Node, StoreError> {
        self.store.create_child(attrs, parent).await
    }

    async fn make_root(&self, id: NodeId) -> Result<(), StoreError> {
        self.store.make_root(id).await
    }

    async fn append_to(&self, id: NodeId, parent: NodeId) -> Result<(), StoreError> {
        self.store.append_to(id, parent).await
    }

    async fn insert_before(&self, id: NodeId, target: NodeId) -> Result<(), StoreError> {
        self.store.insert_before(id, target).await
    }

    async fn insert_after(&self, id: NodeId, target: NodeId) -> Result<(), StoreError> {
        self.store.insert_after(id, target).await
    }

    async fn update(&self, id: NodeId, attrs: &NodeAttributes) -> Result<Node, StoreError> {
        self.store.update(id, attrs).await
    }

    async fn parents(&self, id: NodeId, depth: Option<u32>) -> Result<Vec<Node>, StoreError> {
        self.store.parents(id, depth).await
    }

    async fn children(&self, id: NodeId) -> Result<Vec<Node>, StoreError> {
        self.store.children(id).await
    }

    async fn delete(&self, id: NodeId) -> Result<(), StoreError> {
        self.store.delete(id).await
    }

    async fn delete_with_descendants(&self, id: NodeId) -> Result<u64, StoreError> {
        self.store.delete_with_descendants(id).await
    }
}
