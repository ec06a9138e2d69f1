//! `save`: persist the detail form

use canopy_core::{
    messages, protocol::DEFAULT_SELECTED_NODE_PARAM, ActionEnvelope, ActionOutput,
    HierarchyStore, Node, ParentKey, SaveRequest, SessionEffects, TreeEffects, TreeError,
};

use crate::service::NodeActionService;

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub node: Node,
    pub created: bool,
}

impl NodeActionService {
    pub async fn save<E>(&self, effects: &E, request: SaveRequest) -> ActionEnvelope
    where
        E: TreeEffects + ?Sized,
    {
        let creating = request.tree_node_modify;
        let template = if creating {
            messages::CREATE_FAILED
        } else {
            messages::SAVE_FAILED
        };
        let result = self.try_save(effects, request).await;
        self.process("save", result, template, |outcome| ActionOutput::Saved {
            id: outcome.node.id,
            message: self.titles().format(if outcome.created {
                messages::CREATED
            } else {
                messages::SAVED
            }),
        })
    }

    #[tracing::instrument(
        name = "save",
        skip(self, effects, request),
        fields(node_id = ?request.id, create = request.tree_node_modify)
    )]
    pub async fn try_save<E>(
        &self,
        effects: &E,
        request: SaveRequest,
    ) -> Result<SaveOutcome, TreeError>
    where
        E: TreeEffects + ?Sized,
    {
        let signer = self.signer(effects).await;
        signer.check(&request.signature, &request.payload)?;

        // The signed new-record bit pins whether this request may create.
        if request.tree_node_modify != request.payload.was_new_record {
            return Err(TreeError::validation(messages::operation_disallowed("save")));
        }

        let session_key = request
            .selected_node_param
            .clone()
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| DEFAULT_SELECTED_NODE_PARAM.to_string());

        if request.tree_node_modify {
            let node = self.create_node(effects, request).await?;
            remember_selection(effects, &session_key, &node).await;
            tracing::info!(node_id = %node.id, "node created");
            return Ok(SaveOutcome {
                node,
                created: true,
            });
        }

        let id = request
            .id
            .ok_or_else(|| TreeError::validation("missing node id"))?;
        let existing = effects.get(id).await?;
        let was_active = existing.flags().is_active();

        let node = effects.update(id, &request.attrs).await?;
        remember_selection(effects, &session_key, &node).await;

        let now_active = node.flags().is_active();
        if was_active != now_active {
            let failures = if now_active {
                self.activate_descendants(effects, &node, false).await?
            } else {
                self.deactivate(effects, &node, false).await?
            };
            if !failures.is_empty() {
                tracing::warn!(node_id = %id, failed = failures.len(), "active cascade incomplete");
                return Err(TreeError::cascade(
                    self.titles().format(messages::SAVE_FAILED),
                    failures,
                ));
            }
        }

        tracing::info!(node_id = %id, "node saved");
        Ok(SaveOutcome {
            node,
            created: false,
        })
    }

    async fn create_node<E>(&self, effects: &E, request: SaveRequest) -> Result<Node, TreeError>
    where
        E: TreeEffects + ?Sized,
    {
        let mut attrs = request.attrs;
        attrs.flags.init_defaults();

        match request.parent_key {
            None | Some(ParentKey::Root) => Ok(effects.create_root(attrs).await?),
            Some(ParentKey::Node(parent_id)) => {
                let parent = effects.get(parent_id).await?;
                if !parent.flags().is_child_allowed() {
                    return Err(TreeError::domain(
                        self.titles().format(messages::CHILD_NOT_ALLOWED),
                    ));
                }
                Ok(effects.create_child(attrs, parent_id).await?)
            }
        }
    }
}

async fn remember_selection<S>(session: &S, key: &str, node: &Node)
where
    S: SessionEffects + ?Sized,
{
    if session.is_available() {
        session.session_set(key, node.id.to_string()).await;
    }
}
