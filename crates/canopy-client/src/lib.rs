//! Canopy Client - tree controller
//!
//! Client half of the tree manager. A [`TreeController`] owns the rendered
//! hierarchy as a [`ClientTree`] and keeps it in step with the server:
//!
//! - **selection**: single or multiple, optional cascade to descendants,
//!   mirrored into a [`SelectionValue`]
//! - **expand / collapse** and **search** with a debounce, match markup and
//!   an optional active filter
//! - **create**, **remove** and **move** through a [`NodeTransport`], with
//!   moves mirrored locally using the server's positional rules
//! - a TTL-bounded [`ResponseCache`] for detail reads
//!
//! Pure transitions live in [`ops`]; the controller sequences them, raises
//! vetoable [`TreeEvent`]s and talks to the transport.
//!
//! [`NodeTransport`]: canopy_core::NodeTransport

#![forbid(unsafe_code)]
#![allow(missing_docs)]

pub mod cache;
pub mod controller;
pub mod error;
pub mod events;
pub mod ops;
pub mod panel;
pub mod tree;

pub use cache::ResponseCache;
pub use controller::{PendingMove, PendingRemove, SearchState, TreeBootstrap, TreeController};
pub use error::{ClientError, Result};
pub use events::{EventBus, EventControl, TreeEvent};
pub use ops::{MovePlan, RemoveReconcile, SearchOutcome, SelectionValue, Toolbar};
pub use panel::{Alert, AlertLevel, DetailPanel};
pub use tree::{ClientNode, ClientTree, NodeKey, Permissions};
