//! `remove`: soft or hard deletion of a node

use canopy_core::{
    messages, ActionEnvelope, ActionOutput, HierarchyStore, RemoveRequest, TreeEffects, TreeError,
};

use crate::service::NodeActionService;

/// What a successful remove did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// Marked inactive (with descendants when allowed)
    Deactivated,
    /// Rows physically deleted
    Deleted { count: u64 },
}

impl NodeActionService {
    pub async fn remove<E>(&self, effects: &E, request: RemoveRequest) -> ActionEnvelope
    where
        E: TreeEffects + ?Sized,
    {
        let result = self.try_remove(effects, request).await;
        self.process("remove", result, messages::REMOVE_FAILED, |_| {
            ActionOutput::Message(self.titles().format(messages::REMOVED))
        })
    }

    #[tracing::instrument(
        name = "remove",
        skip(self, effects, request),
        fields(node_id = %request.id, soft = request.payload.soft_delete)
    )]
    pub async fn try_remove<E>(
        &self,
        effects: &E,
        request: RemoveRequest,
    ) -> Result<RemoveOutcome, TreeError>
    where
        E: TreeEffects + ?Sized,
    {
        let signer = self.signer(effects).await;
        signer.check(&request.signature, &request.payload)?;

        let node = effects.get(request.id).await?;
        if !node.flags().is_removable() {
            return Err(TreeError::domain(self.titles().format(messages::NOT_REMOVABLE)));
        }

        if request.payload.soft_delete {
            let failures = self.deactivate(effects, &node, true).await?;
            if !failures.is_empty() {
                return Err(TreeError::cascade(
                    self.titles().format(messages::REMOVE_FAILED),
                    failures,
                ));
            }
            tracing::info!("node deactivated");
            return Ok(RemoveOutcome::Deactivated);
        }

        // Childless roots take the cascading path too; the result is the same
        // single row.
        let cascade = node.flags().is_removable_all() || (node.is_root() && node.is_leaf());
        let count = if cascade {
            effects.delete_with_descendants(node.id).await?
        } else if !node.is_leaf() {
            return Err(TreeError::domain(self.titles().format(messages::HAS_DESCENDANTS)));
        } else {
            effects.delete(node.id).await?;
            1
        };

        tracing::info!(count, "node deleted");
        Ok(RemoveOutcome::Deleted { count })
    }
}
