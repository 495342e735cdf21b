//! Test World Allocation
//!
//! One isolated world per parallel test worker. A [`WorldAllocator`] is
//! constructed once per test run and passed to worker setup and teardown
//! hooks; [`ProfileTable`] decides which definition a test file gets.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod allocator;
pub mod error;
pub mod profile;

// Re-exports
pub use allocator::{WorkerWorldInfo, WorldAllocator};
pub use error::AllocError;
pub use profile::{ProfileTable, SeedProfile};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
