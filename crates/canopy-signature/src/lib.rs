//! Canopy Signature - stateless request signing
//!
//! Every mutating node action echoes a token minted by a previous response.
//! The token binds the action kind and a fixed list of request fields (see
//! `canopy_core::protocol`) under a keyed hash. A request whose token fails
//! its own MAC check, or whose current fields hash to a different token, is
//! refused as `OperationDisallowed` before anything is touched.
//!
//! Tokens never expire; they are valid as long as the salt is.

#![forbid(unsafe_code)]

pub mod salt;
pub mod service;
pub mod token;

pub use salt::{Salt, SaltPolicy, SaltSource};
pub use service::{InvocationContext, SignatureService};

use canopy_core::TreeError;

/// Why a token was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// Not a token at all (too short, bad hex, bad encoding)
    #[error("malformed signature token")]
    Malformed,
    /// Embedded MAC does not match the embedded data
    #[error("signature token has been tampered with")]
    Tampered,
    /// Token is intact but was minted for different request fields
    #[error("signature does not match the request")]
    Mismatch,
    /// The salt could not be used as a MAC key
    #[error("invalid signing key")]
    InvalidKey,
}

impl From<SignatureError> for TreeError {
    fn from(err: SignatureError) -> Self {
        TreeError::validation(err.to_string())
    }
}
