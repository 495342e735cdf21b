//! Test Worlds Core
//!
//! Named, mutually isolated worlds of seed data for parallel end-to-end
//! tests.
//!
//! # Core Concepts
//!
//! - [`WorldDefinition`]: Immutable catalog entry (users, artifacts, chats)
//! - [`WorldRegistry`]: Lookup plus synchronous structural validation
//! - [`WorldId`]: World tag carried by every world-scoped row
//! - [`TestWorldsConfig`]: File and environment configuration
//!
//! # Example
//!
//! ```rust
//! use testworld_core::{catalog, WorldRegistry};
//!
//! let registry = WorldRegistry::builtin();
//! let world = registry.validate(catalog::SOLO_WRITER).unwrap();
//! assert_eq!(world.users.len(), 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod registry;
pub mod types;

// Re-exports
pub use config::{AiConfig, FixtureMode, SeedProfileConfig, TestWorldsConfig, ValidatorConfig};
pub use error::{ConfigError, RegistryError, StructuralError};
pub use registry::{check_structure, WorldRegistry};
pub use types::{
    ArtifactKind, EntityKind, UserRole, WorldArtifact, WorldChat, WorldDefinition, WorldId,
    WorldSettings, WorldUser,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with world definitions
    pub use crate::{
        check_structure, ArtifactKind, EntityKind, RegistryError, StructuralError,
        TestWorldsConfig, WorldDefinition, WorldId, WorldRegistry,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
