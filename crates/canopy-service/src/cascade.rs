//! Activate / deactivate cascades
//!
//! A cascade touches descendants only when the node allows removal with
//! descendants. Each descendant save is independent: a failure is recorded
//! and the walk continues. Nothing already applied is rolled back.

use canopy_core::{HierarchyStore, Node, NodeFailure, NodeFlag, TreeError};

use crate::service::NodeActionService;

impl NodeActionService {
    /// Reactivate the descendants of `node`, and the node itself when
    /// `include_self` is set. Returns the descendants that failed to save.
    pub async fn activate_descendants<S>(
        &self,
        store: &S,
        node: &Node,
        include_self: bool,
    ) -> Result<Vec<NodeFailure>, TreeError>
    where
        S: HierarchyStore + ?Sized,
    {
        set_active(store, node, include_self, true).await
    }

    /// Soft-delete counterpart of [`Self::activate_descendants`].
    pub async fn deactivate<S>(
        &self,
        store: &S,
        node: &Node,
        include_self: bool,
    ) -> Result<Vec<NodeFailure>, TreeError>
    where
        S: HierarchyStore + ?Sized,
    {
        set_active(store, node, include_self, false).await
    }
}

async fn save_active<S>(store: &S, node: &Node, active: bool) -> Option<NodeFailure>
where
    S: HierarchyStore + ?Sized,
{
    let mut attrs = node.attrs.clone();
    attrs.flags.set(NodeFlag::Active, active);
    match store.update(node.id, &attrs).await {
        Ok(_) => None,
        Err(err) => {
            tracing::warn!(node_id = %node.id, active, error = %err, "cascade save failed");
            Some(NodeFailure {
                id: node.id,
                name: node.attrs.name.clone(),
                errors: err.messages(),
            })
        }
    }
}

async fn set_active<S>(
    store: &S,
    node: &Node,
    include_self: bool,
    active: bool,
) -> Result<Vec<NodeFailure>, TreeError>
where
    S: HierarchyStore + ?Sized,
{
    let mut failures = Vec::new();

    if node.flags().is_removable_all() {
        let descendants = store.children(node.id).await?;
        tracing::debug!(
            node_id = %node.id,
            active,
            count = descendants.len(),
            "cascading to descendants"
        );
        for child in &descendants {
            if let Some(failure) = save_active(store, child, active).await {
                failures.push(failure);
            }
        }
    }

    if include_self {
        if let Some(failure) = save_active(store, node, active).await {
            failures.push(failure);
        }
    }

    Ok(failures)
}
