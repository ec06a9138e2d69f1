//! Canopy Core - shared model for the Canopy tree manager
//!
//! Types and interfaces shared by every other Canopy crate. No crate below
//! this one exists; everything here is either a plain data type or an effect
//! trait describing an external collaborator.
//!
//! # Contents
//!
//! ## Data model
//! - [`Node`], [`NodeFlags`] with policy defaults, [`Position`] (nested-set
//!   coordinates owned by the store)
//!
//! ## Wire contract
//! - Four requests (`manage`, `save`, `remove`, `move`) each carrying a signed
//!   payload, answered by a uniform [`ActionEnvelope`] of `{out, status}`
//!
//! ## Effect interfaces
//! - [`HierarchyStore`], [`SessionEffects`], [`TimeSource`], [`NodeTransport`]
//!
//! ## Errors
//! - [`TreeError`] taxonomy (validation, domain, persistence, cascade)

#![forbid(unsafe_code)]
#![allow(missing_docs)]

pub mod config;
pub mod effects;
pub mod errors;
pub mod messages;
pub mod node;
pub mod protocol;
pub mod wire;

pub use config::{CanopyConfig, ClientConfig, RenderConfig, SignatureConfig};
pub use effects::{
    HierarchyStore, NodeTransport, SessionEffects, SystemClock, TimeSource, TransportError,
    TreeEffects,
};
pub use errors::{FieldError, NodeFailure, Result, StoreError, TreeError};
pub use messages::NodeTitles;
pub use node::{Direction, IconKind, Node, NodeAttributes, NodeFlag, NodeFlags, NodeId, Position};
pub use protocol::{
    ActionKind, ActionPolicy, BreadcrumbConfig, ManagePayload, MovePayload, RemovePayload,
    SavePayload, SignedPayload,
};
pub use wire::{
    ActionEnvelope, ActionOutput, ActionStatus, ActionTokens, ManageRequest, MoveRequest,
    NodeDetail, ParentKey, RemoveRequest, SaveRequest,
};
