//! Signing and verification of action payloads

use canopy_core::{
    ActionTokens, ManagePayload, MovePayload, RemovePayload, SavePayload, SessionEffects,
    SignatureConfig, SignedPayload, TreeError,
};
use subtle::ConstantTimeEq;

use crate::salt::{Salt, SaltPolicy};
use crate::token;
use crate::SignatureError;

/// Execution context of the caller.
///
/// `Console` is the narrow escape hatch for trusted back-office callers
/// (migrations, batch jobs); it skips verification entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvocationContext {
    /// Request from a client; every token is checked
    #[default]
    Web,
    /// Trusted back-office caller
    Console,
}

/// Mints and checks tokens under a single salt.
#[derive(Debug, Clone)]
pub struct SignatureService {
    salt: Salt,
    context: InvocationContext,
}

impl SignatureService {
    /// Service signing under `salt`.
    pub fn new(salt: Salt, context: InvocationContext) -> Self {
        Self { salt, context }
    }

    /// Build a service whose salt comes from `session` (or the fallback).
    pub async fn for_session<S>(
        config: &SignatureConfig,
        session: &S,
        context: InvocationContext,
    ) -> Self
    where
        S: SessionEffects + ?Sized,
    {
        let salt = SaltPolicy::from_config(config).resolve(session).await;
        Self::new(salt, context)
    }

    /// Active salt
    pub fn salt(&self) -> &Salt {
        &self.salt
    }

    /// Context the service was built for
    pub fn context(&self) -> InvocationContext {
        self.context
    }

    /// Token bound to `payload` under its action kind.
    pub fn sign<P: SignedPayload>(&self, payload: &P) -> Result<String, SignatureError> {
        token::hash_data(self.salt.as_bytes(), P::KIND, &payload.canonical())
    }

    /// Check `old_token` against the current payload.
    ///
    /// Passes only when the token's own MAC is intact and it equals the token
    /// recomputed from `payload`.
    pub fn verify<P: SignedPayload>(
        &self,
        old_token: &str,
        payload: &P,
    ) -> Result<(), SignatureError> {
        if self.context == InvocationContext::Console {
            tracing::debug!(action = %P::KIND, "console context, signature check skipped");
            return Ok(());
        }

        token::validate(self.salt.as_bytes(), P::KIND, old_token)?;

        let fresh = self.sign(payload)?;
        if bool::from(fresh.as_bytes().ct_eq(old_token.as_bytes())) {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }

    /// [`Self::verify`] mapped into the action-boundary taxonomy.
    pub fn check<P: SignedPayload>(&self, old_token: &str, payload: &P) -> Result<(), TreeError> {
        self.verify(old_token, payload).map_err(|err| {
            tracing::warn!(action = %P::KIND, reason = %err, "request signature rejected");
            TreeError::operation_disallowed(P::KIND)
        })
    }

    /// Tokens for the initial tree page. The save token is minted per form.
    pub fn mint_bundle(
        &self,
        manage: &ManagePayload,
        remove: &RemovePayload,
        move_: &MovePayload,
    ) -> Result<ActionTokens, SignatureError> {
        Ok(ActionTokens {
            manage: self.sign(manage)?,
            save: None,
            remove: self.sign(remove)?,
            move_: self.sign(move_)?,
        })
    }

    /// Save token for a detail form.
    pub fn sign_save(
        &self,
        was_new_record: bool,
        manage: &ManagePayload,
    ) -> Result<String, SignatureError> {
        self.sign(&SavePayload {
            was_new_record,
            current_url: manage.current_url.clone(),
            store_class: manage.store_class.clone(),
        })
    }
}
