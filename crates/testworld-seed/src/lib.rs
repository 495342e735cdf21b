//! Test World Seeding
//!
//! Materializes a [`testworld_core::WorldDefinition`] into a backing store
//! with one bulk write per phase, and removes a world's rows again.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use testworld_core::{catalog, WorldId, WorldRegistry};
//! use testworld_fixtures::FixtureLoader;
//! use testworld_seed::SeedEngine;
//! use testworld_store::MemoryStore;
//!
//! # async fn run() -> Result<(), testworld_seed::SeedError> {
//! let engine = SeedEngine::new(
//!     Arc::new(MemoryStore::new()),
//!     FixtureLoader::new("fixtures/worlds"),
//!     Arc::new(WorldRegistry::builtin()),
//! );
//! let world = WorldId::new("w-demo");
//! let result = engine.seed(&world, catalog::SOLO_WRITER).await?;
//! assert_eq!(result.users.count, 1);
//! engine.cleanup(&world).await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod engine;
pub mod error;
pub mod ids;
pub mod messages;

// Re-exports
pub use engine::{CleanupReport, MissingFixturePolicy, PhaseStats, SeedEngine, SeedResult};
pub use error::{Result, SeedError, SeedPhase};
pub use ids::IdGenerator;
pub use messages::{normalize_message, parse_message_fixture, FixtureMessage, MessageError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
