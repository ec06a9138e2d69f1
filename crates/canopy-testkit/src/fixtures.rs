//! Signed-request fixtures over a seeded tree

use canopy_core::{
    ActionOutput, ActionPolicy, CanopyConfig, Direction, ManageRequest, MoveRequest,
    NodeAttributes, NodeId, ParentKey, RemoveRequest, SavePayload, SaveRequest, TreeError,
};
use canopy_client::{TreeBootstrap, TreeController};
use canopy_service::{NodeActionService, TreePage};

use crate::effects::TestEffects;
use crate::store::MemoryHierarchyStore;
use crate::time::ControllableClock;
use crate::transport::LoopbackTransport;

/// Store class used by fixtures
pub const STORE_CLASS: &str = "app\\models\\Category";

const CURRENT_URL: &str = "/admin/categories";

/// A seeded tree, a service and the initial page tokens.
#[derive(Debug, Clone)]
pub struct TreeFixture {
    pub service: NodeActionService,
    pub effects: TestEffects,
    pub page: TreePage,
}

impl TreeFixture {
    /// Seed from a `(depth, name)` outline with default configuration.
    pub async fn new(outline: &[(u32, &str)]) -> Result<Self, TreeError> {
        Self::with_config(outline, CanopyConfig::default()).await
    }

    /// Seed with explicit configuration and the default action policy.
    pub async fn with_config(
        outline: &[(u32, &str)],
        config: CanopyConfig,
    ) -> Result<Self, TreeError> {
        Self::with_policy(outline, config, ActionPolicy::default()).await
    }

    /// Seed with explicit configuration; the page payloads are signed under
    /// `policy`.
    pub async fn with_policy(
        outline: &[(u32, &str)],
        config: CanopyConfig,
        policy: ActionPolicy,
    ) -> Result<Self, TreeError> {
        let effects = TestEffects::new(MemoryHierarchyStore::from_outline(outline));
        let service = NodeActionService::new(config);
        let page = service
            .tree_page(
                &effects,
                policy.manage_payload(STORE_CLASS, CURRENT_URL),
                policy.remove_payload(STORE_CLASS),
                policy.move_payload(STORE_CLASS),
            )
            .await?;
        Ok(Self {
            service,
            effects,
            page,
        })
    }

    /// Page data in the shape the client controller boots from
    pub fn bootstrap(&self) -> TreeBootstrap {
        TreeBootstrap {
            markup: self.page.markup.clone(),
            tokens: self.page.tokens.clone(),
            selected: self.page.selected,
            manage: self.page.manage.clone(),
            remove: self.page.remove.clone(),
            move_: self.page.move_.clone(),
            show_inactive: self.page.show_inactive,
        }
    }

    /// Controller wired to this fixture's service through a loopback.
    pub fn controller(
        &self,
        clock: ControllableClock,
    ) -> TreeController<LoopbackTransport, ControllableClock> {
        let transport = LoopbackTransport::new(self.service.clone(), self.effects.clone());
        TreeController::new(self.service.config(), self.bootstrap(), transport, clock)
    }

    pub fn manage_request(
        &self,
        id: Option<NodeId>,
        parent_key: Option<ParentKey>,
    ) -> ManageRequest {
        ManageRequest {
            id,
            parent_key,
            payload: self.page.manage.clone(),
            signature: self.page.tokens.manage.clone(),
            remove_token: self.page.tokens.remove.clone(),
            move_token: self.page.tokens.move_.clone(),
        }
    }

    pub fn remove_request(&self, id: NodeId) -> RemoveRequest {
        RemoveRequest {
            id,
            payload: self.page.remove.clone(),
            signature: self.page.tokens.remove.clone(),
        }
    }

    pub fn move_request(&self, from: NodeId, to: NodeId, direction: Direction) -> MoveRequest {
        MoveRequest {
            id_from: from,
            id_to: to,
            direction,
            payload: self.page.move_.clone(),
            signature: self.page.tokens.move_.clone(),
        }
    }

    /// Fetch the form through `manage` and build a save request from its token.
    pub async fn save_request(
        &self,
        id: Option<NodeId>,
        parent_key: Option<ParentKey>,
        attrs: NodeAttributes,
    ) -> Result<SaveRequest, TreeError> {
        let envelope = self
            .service
            .manage(&self.effects, self.manage_request(id, parent_key))
            .await;
        let detail = match envelope.out {
            ActionOutput::Detail(detail) => detail,
            other => return Err(TreeError::internal(format!("manage failed: {other:?}"))),
        };
        let is_new = detail.is_new();
        Ok(SaveRequest {
            id,
            attrs,
            tree_node_modify: is_new,
            parent_key,
            selected_node_param: None,
            payload: SavePayload {
                was_new_record: is_new,
                current_url: self.page.manage.current_url.clone(),
                store_class: self.page.manage.store_class.clone(),
            },
            signature: detail.tokens.save.unwrap_or_default(),
        })
    }
}
