//! Loopback transport wiring a client controller straight into a service

use async_trait::async_trait;
use canopy_core::{
    ActionEnvelope, ManageRequest, MoveRequest, NodeTransport, RemoveRequest, SaveRequest,
    TransportError,
};
use canopy_service::NodeActionService;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::effects::TestEffects;

/// One request seen by the loopback, for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Manage { url: String },
    Save,
    Remove,
    Move,
}

/// Calls the service in-process; records every request.
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    service: NodeActionService,
    effects: TestEffects,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    fail_next: Arc<AtomicBool>,
}

impl LoopbackTransport {
    pub fn new(service: NodeActionService, effects: TestEffects) -> Self {
        Self {
            service,
            effects,
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_next: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn effects(&self) -> &TestEffects {
        &self.effects
    }

    /// Requests seen so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of manage round-trips
    pub fn manage_calls(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, RecordedCall::Manage { .. }))
            .count()
    }

    /// Make the next request fail at the network level
    pub fn fail_next_request(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn record(&self, call: RecordedCall) -> Result<(), TransportError> {
        self.calls.lock().push(call);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(TransportError::network("connection reset"));
        }
        Ok(())
    }
}

#[async_trait]
impl NodeTransport for LoopbackTransport {
    async fn manage(
        &self,
        url: &str,
        request: ManageRequest,
    ) -> Result<ActionEnvelope, TransportError> {
        self.record(RecordedCall::Manage { url: url.to_string() })?;
        Ok(self.service.manage(&self.effects, request).await)
    }

    async fn save(&self, request: SaveRequest) -> Result<ActionEnvelope, TransportError> {
        self.record(RecordedCall::Save)?;
        Ok(self.service.save(&self.effects, request).await)
    }

    async fn remove(&self, request: RemoveRequest) -> Result<ActionEnvelope, TransportError> {
        self.record(RecordedCall::Remove)?;
        Ok(self.service.remove(&self.effects, request).await)
    }

    async fn move_node(&self, request: MoveRequest) -> Result<ActionEnvelope, TransportError> {
        self.record(RecordedCall::Move)?;
        Ok(self.service.move_node(&self.effects, request).await)
    }
}
