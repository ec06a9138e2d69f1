//! Canopy Testkit - in-memory collaborators and fixtures
//!
//! - [`MemoryHierarchyStore`]: reference nested-set store with failure injection
//! - [`MemorySession`], [`TestEffects`]: session and the combined host effects
//! - [`ControllableClock`]: deterministic time for cache TTL and debounce
//! - [`LoopbackTransport`]: client-to-service wiring without a network
//! - [`TreeFixture`]: seeded tree plus correctly signed requests

#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

pub mod effects;
pub mod fixtures;
pub mod session;
pub mod store;
pub mod time;
pub mod transport;

pub use effects::TestEffects;
pub use fixtures::{TreeFixture, STORE_CLASS};
pub use session::MemorySession;
pub use store::MemoryHierarchyStore;
pub use time::ControllableClock;
pub use transport::{LoopbackTransport, RecordedCall};

/// Install a `fmt` subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
