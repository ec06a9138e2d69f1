//! Node action service
//!
//! Server-side handlers for the four node actions. The service is a small
//! immutable value (configuration plus invocation context); every action
//! takes the host effects per call rather than storing them, so one service
//! can serve any number of sessions.
//!
//! Each public action returns an [`ActionEnvelope`]. The matching `try_*`
//! method returns the typed result instead; the public wrapper converts any
//! [`TreeError`] into the `{out, status}` envelope so that nothing escapes the
//! action boundary as a fault.

use canopy_core::{
    ActionEnvelope, ActionOutput, CanopyConfig, NodeTitles, SessionEffects, TreeError,
};
use canopy_signature::{InvocationContext, SignatureService};

/// Handles manage, save, remove and move requests.
#[derive(Debug, Clone, Default)]
pub struct NodeActionService {
    pub(crate) config: CanopyConfig,
    pub(crate) context: InvocationContext,
}

impl NodeActionService {
    /// Create a service for web requests
    pub fn new(config: CanopyConfig) -> Self {
        Self {
            config,
            context: InvocationContext::Web,
        }
    }

    /// Create a service for a trusted back-office context (signatures unchecked)
    pub fn for_console(config: CanopyConfig) -> Self {
        Self {
            config,
            context: InvocationContext::Console,
        }
    }

    pub fn config(&self) -> &CanopyConfig {
        &self.config
    }

    pub fn titles(&self) -> &NodeTitles {
        &self.config.titles
    }

    /// Signer keyed by the caller's session salt
    pub async fn signer<S>(&self, session: &S) -> SignatureService
    where
        S: SessionEffects + ?Sized,
    {
        SignatureService::for_session(&self.config.signature, session, self.context).await
    }

    /// Convert an action result into the response envelope.
    ///
    /// `error_template` is the generic failure message used when the error
    /// carries nothing fit for the operator (not found, internal).
    pub(crate) fn process<T>(
        &self,
        action: &'static str,
        result: Result<T, TreeError>,
        error_template: &str,
        on_success: impl FnOnce(T) -> ActionOutput,
    ) -> ActionEnvelope {
        match result {
            Ok(value) => ActionEnvelope::success(on_success(value)),
            Err(err) => {
                tracing::warn!(action, kind = err.kind(), error = %err, "node action failed");
                let fallback = self.titles().format(error_template);
                ActionEnvelope::error(match err {
                    TreeError::Validation { message } | TreeError::Domain { message } => {
                        ActionOutput::Message(message)
                    }
                    TreeError::Persistence { fields, .. } => ActionOutput::FieldErrors {
                        message: fallback,
                        fields,
                    },
                    TreeError::Cascade { message, failures } => ActionOutput::Failures {
                        message,
                        items: failures,
                    },
                    TreeError::NotFound { .. } | TreeError::Internal { .. } => {
                        ActionOutput::Message(fallback)
                    }
                })
            }
        }
    }
}
