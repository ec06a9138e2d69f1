//! Canopy Service - node action handlers
//!
//! Implements the server half of the tree manager protocol:
//!
//! - **manage**: detail view (or new-node form) with freshly minted tokens
//! - **save**: create under a parent or as a root, update attributes, and
//!   cascade an `active` transition to descendants
//! - **remove**: soft delete (deactivation cascade) or hard delete
//! - **move**: sibling reorder, promote, demote
//!
//! Every action verifies its signature first and answers with the uniform
//! `{out, status}` envelope.
//!
//! # Error handling
//!
//! Expected failures (a refused signature, a forbidden move, a descendant
//! that will not save) are values, not panics. Cascades report every failed
//! descendant by id and name and leave already-applied changes in place.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

mod cascade;
mod manage;
mod moves;
mod page;
mod remove;
mod save;
mod service;

pub use page::TreePage;
pub use remove::RemoveOutcome;
pub use save::SaveOutcome;
pub use service::NodeActionService;
