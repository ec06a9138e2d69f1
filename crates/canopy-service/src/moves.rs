//! `move`: reposition a node among its siblings or across levels
//!
//! | dir | `id_to` | store call |
//! |-----|---------|------------|
//! | u | previous sibling | insert before |
//! | d | next sibling | insert after |
//! | l | current parent | insert after, or make root when the parent is a root |
//! | r | previous sibling | append to |

use canopy_core::{
    messages, ActionEnvelope, ActionOutput, Direction, HierarchyStore, MoveRequest, StoreError,
    TreeEffects, TreeError,
};

use crate::service::NodeActionService;

fn store_failure(err: StoreError) -> TreeError {
    TreeError::domain(err.to_string())
}

impl NodeActionService {
    pub async fn move_node<E>(&self, effects: &E, request: MoveRequest) -> ActionEnvelope
    where
        E: TreeEffects + ?Sized,
    {
        let result = self.try_move(effects, request).await;
        self.process("move", result, messages::MOVE_FAILED, |_| {
            ActionOutput::Message(self.titles().format(messages::MOVED))
        })
    }

    #[tracing::instrument(
        name = "move",
        skip(self, effects, request),
        fields(from = %request.id_from, to = %request.id_to, direction = %request.direction)
    )]
    pub async fn try_move<E>(&self, effects: &E, request: MoveRequest) -> Result<(), TreeError>
    where
        E: TreeEffects + ?Sized,
    {
        let signer = self.signer(effects).await;
        signer.check(&request.signature, &request.payload)?;

        let from = effects.get(request.id_from).await?;
        let to = effects.get(request.id_to).await?;

        if !from.flags().is_movable(request.direction) {
            return Err(TreeError::domain(self.titles().format(messages::NOT_MOVABLE)));
        }

        let root_reorder = || TreeError::domain(self.titles().format(messages::ROOT_REORDER));

        match request.direction {
            Direction::Right => effects.append_to(from.id, to.id).await.map_err(store_failure)?,
            Direction::Left if to.is_root() => {
                if !request.payload.allow_new_roots {
                    return Err(root_reorder());
                }
                effects.make_root(from.id).await.map_err(store_failure)?;
            }
            _ if to.is_root() => return Err(root_reorder()),
            Direction::Up => effects.insert_before(from.id, to.id).await.map_err(store_failure)?,
            Direction::Down | Direction::Left => {
                effects.insert_after(from.id, to.id).await.map_err(store_failure)?;
            }
        }

        tracing::info!("node moved");
        Ok(())
    }
}
