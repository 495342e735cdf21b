//! Test Worlds Validator
//!
//! Offline checks for the world catalog: structure, fixture presence and
//! format, dependency resolution, and size limits.
//!
//! Errors fail a world; warnings (oversized fixtures, too many fixtures)
//! are advisory. The `testworld-validate` binary wraps [`WorldValidator`]
//! and exits non-zero when any world has errors.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use testworld_core::WorldRegistry;
//! use testworld_fixtures::FixtureLoader;
//! use testworld_validator::WorldValidator;
//!
//! # async fn run() {
//! let validator = WorldValidator::new(
//!     Arc::new(WorldRegistry::builtin()),
//!     FixtureLoader::new("fixtures/worlds"),
//! );
//! let report = validator.validate_all().await;
//! println!("{}", report.generate_text());
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod report;
pub mod validator;

// Re-exports
pub use report::{Finding, FindingCode, ValidationReport, WorldReport};
pub use validator::WorldValidator;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
