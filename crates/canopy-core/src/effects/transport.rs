//! Client-side transport for the node actions

use crate::wire::{ActionEnvelope, ManageRequest, MoveRequest, RemoveRequest, SaveRequest};
use async_trait::async_trait;

/// Failure to obtain an envelope at all. Domain failures arrive as an
/// envelope with `status = error`, not as a `TransportError`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {message}")]
    Network { message: String },
    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },
    #[error("malformed response: {message}")]
    Decode { message: String },
}

impl TransportError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }
}

/// Issues node action requests on behalf of the client controller.
#[async_trait]
pub trait NodeTransport: Send + Sync {
    /// `url` is the full manage URL including the cache discriminator
    async fn manage(
        &self,
        url: &str,
        request: ManageRequest,
    ) -> Result<ActionEnvelope, TransportError>;

    async fn save(&self, request: SaveRequest) -> Result<ActionEnvelope, TransportError>;

    async fn remove(&self, request: RemoveRequest) -> Result<ActionEnvelope, TransportError>;

    async fn move_node(&self, request: MoveRequest) -> Result<ActionEnvelope, TransportError>;
}
