//! Effect interfaces for external collaborators
//!
//! Pure trait definitions. Handlers live elsewhere: the host application
//! supplies the real store, session and transport; `canopy-testkit` supplies
//! in-memory ones.
//!
//! - **HierarchyStore**: nested-set persistence and positional mutation
//! - **Session**: per-user key/value storage (salt, selected node)
//! - **Time**: wall clock in milliseconds for cache TTL and debounce
//! - **Transport**: client-side access to the four node actions

pub mod session;
pub mod store;
pub mod time;
pub mod transport;

pub use session::SessionEffects;
pub use store::HierarchyStore;
pub use time::{SystemClock, TimeSource};
pub use transport::{NodeTransport, TransportError};

/// Everything a node action needs from its host.
pub trait TreeEffects: HierarchyStore + SessionEffects {}

impl<T: HierarchyStore + SessionEffects> TreeEffects for T {}
