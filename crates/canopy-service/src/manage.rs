//! `manage`: detail view for one node, or the empty form for a new one

use canopy_core::{
    messages, ActionEnvelope, ActionOutput, ActionTokens, HierarchyStore, ManageRequest,
    NodeAttributes, NodeDetail, ParentKey, TreeEffects, TreeError,
};
use canopy_render::{ancestor_limit, breadcrumbs, new_node_breadcrumbs};

use crate::service::NodeActionService;

impl NodeActionService {
    /// View, create or update form for a node.
    pub async fn manage<E>(&self, effects: &E, request: ManageRequest) -> ActionEnvelope
    where
        E: TreeEffects + ?Sized,
    {
        let result = self.try_manage(effects, request).await;
        self.process("manage", result, messages::VIEW_FAILED, |detail| {
            ActionOutput::Detail(Box::new(detail))
        })
    }

    #[tracing::instrument(
        name = "manage",
        skip(self, effects, request),
        fields(node_id = ?request.id, parent_key = ?request.parent_key)
    )]
    pub async fn try_manage<E>(
        &self,
        effects: &E,
        request: ManageRequest,
    ) -> Result<NodeDetail, TreeError>
    where
        E: TreeEffects + ?Sized,
    {
        let signer = self.signer(effects).await;
        signer.check(&request.signature, &request.payload)?;

        let crumbs_config = &request.payload.breadcrumbs;
        let limit = ancestor_limit(crumbs_config);

        let (node, attrs, trail) = match request.id {
            Some(id) => {
                let node = effects.get(id).await?;
                let ancestors = effects.parents(id, limit).await?;
                let trail = breadcrumbs(&node, &ancestors, crumbs_config);
                let attrs = node.attrs.clone();
                (Some(node), attrs, trail)
            }
            None => {
                let trail = match request.parent_key {
                    Some(ParentKey::Node(parent_id)) if crumbs_config.depth != Some(0) => {
                        let parent = effects.get(parent_id).await?;
                        let ancestors = effects.parents(parent_id, limit).await?;
                        new_node_breadcrumbs(Some((&parent, &ancestors)), crumbs_config)
                    }
                    _ => new_node_breadcrumbs(None, crumbs_config),
                };
                (None, NodeAttributes::new_defaults(), trail)
            }
        };

        let tokens = ActionTokens {
            manage: signer.sign(&request.payload)?,
            save: Some(signer.sign_save(node.is_none(), &request.payload)?),
            remove: request.remove_token,
            move_: request.move_token,
        };

        tracing::debug!(is_new = node.is_none(), "manage detail built");

        Ok(NodeDetail {
            node,
            attrs,
            parent_key: request.parent_key,
            breadcrumbs: trail,
            tokens,
            options: request.payload,
        })
    }
}
