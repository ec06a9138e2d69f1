//! Initial tree page: rendered hierarchy plus the token bundle

use canopy_core::{
    protocol::DEFAULT_SELECTED_NODE_PARAM, ActionTokens, HierarchyStore, ManagePayload,
    MovePayload, NodeId, RemovePayload, SessionEffects, TreeEffects, TreeError,
};
use canopy_render::{render, MarkupTree, RenderOptions};
use serde::{Deserialize, Serialize};

use crate::service::NodeActionService;

/// Everything the client needs to boot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreePage {
    pub markup: MarkupTree,
    pub tokens: ActionTokens,
    /// Node remembered by the last save, if still present
    pub selected: Option<NodeId>,
    pub manage: ManagePayload,
    pub remove: RemovePayload,
    #[serde(rename = "move")]
    pub move_: MovePayload,
    /// Inactive nodes were rendered
    pub show_inactive: bool,
}

impl NodeActionService {
    /// Render the tree and mint the manage, remove and move tokens.
    pub async fn tree_page<E>(
        &self,
        effects: &E,
        manage: ManagePayload,
        remove: RemovePayload,
        move_: MovePayload,
    ) -> Result<TreePage, TreeError>
    where
        E: TreeEffects + ?Sized,
    {
        let signer = self.signer(effects).await;
        let tokens = signer.mint_bundle(&manage, &remove, &move_)?;

        let nodes = effects.ordered_nodes().await?;
        let options = RenderOptions {
            is_admin: manage.is_admin,
            ..RenderOptions::from(&self.config.render)
        };
        let markup = render(&nodes, &options, &self.config.render.empty_message);

        let key = if manage.selected_node_param.is_empty() {
            DEFAULT_SELECTED_NODE_PARAM
        } else {
            manage.selected_node_param.as_str()
        };
        let selected = selected_node(effects, key)
            .await
            .filter(|id| nodes.iter().any(|n| n.id == *id));

        tracing::debug!(nodes = nodes.len(), ?selected, "tree page rendered");

        Ok(TreePage {
            markup,
            tokens,
            selected,
            manage,
            remove,
            move_,
            show_inactive: options.show_inactive,
        })
    }
}

async fn selected_node<S>(session: &S, key: &str) -> Option<NodeId>
where
    S: SessionEffects + ?Sized,
{
    if !session.is_available() {
        return None;
    }
    session.session_get(key).await?.parse().ok()
}
