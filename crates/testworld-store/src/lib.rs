//! Test World Store
//!
//! Request-scoped world context, the isolation predicate and the bulk
//! backing-store contract used by seeding and cleanup.
//!
//! # Core Concepts
//!
//! - [`WorldContext`]: Derived once per request from a signed token
//! - [`can_access`]: The single isolation invariant (tag equality)
//! - [`WorldStore`]: Bulk insert, bulk delete and filtered select
//! - [`ScopedStore`]: Store handle bound to one context
//! - [`MemoryStore`]: In-process store with key and foreign-key checks

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod context;
pub mod error;
pub mod memory;
pub mod rows;
pub mod scoped;
pub mod store;

// Re-exports
pub use context::{
    can_access, filter_for, tag, ContextSigner, WorldContext, WorldFilter, WORLD_COOKIE,
    WORLD_HEADER,
};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use rows::{
    ArtifactRow, ChatRow, MessagePart, MessageRow, Row, RowBatch, SuggestionRow, UserRow,
    WorldScoped,
};
pub use scoped::ScopedStore;
pub use store::WorldStore;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for world-scoped data access
    pub use crate::{
        can_access, filter_for, tag, Row, RowBatch, ScopedStore, StoreError, WorldContext,
        WorldFilter, WorldScoped, WorldStore,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
