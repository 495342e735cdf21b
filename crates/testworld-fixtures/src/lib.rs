//! Test Worlds Fixtures
//!
//! File-backed fixture content for world seeding and validation.
//!
//! # Layout
//!
//! ```text
//! {root}/{world_id}/{relative_path}     world seed content
//! {root}/ai/{scope}/{fixture_id}.json   recorded AI responses
//! ```
//!
//! Missing artifact content is replaced by [`placeholder_for`] during
//! seeding and reported as [`FixtureError::Missing`] by strict loads.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod format;
pub mod loader;
pub mod placeholder;

// Re-exports
pub use error::{FixtureError, FormatError};
pub use format::{check_format, ContentRole, FixtureFormat};
pub use loader::{ContentSource, FixtureLoader, LoadedContent};
pub use placeholder::placeholder_for;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
