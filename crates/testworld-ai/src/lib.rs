//! Test World AI Fixtures
//!
//! Deterministic, content-addressed record/replay of language-model calls.
//!
//! # Core Concepts
//!
//! - [`LanguageModel`]: Minimal generate/stream client contract
//! - [`FixtureProvider`]: Decorator with an explicit [`FixtureMode`]
//! - [`AIFixture`]: One recorded call, stored as camelCase JSON
//! - [`fixture_id`]: blake3 over normalized prompt, model and context
//! - [`FixtureStore`]: Fixture files plus an in-process moka cache
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use testworld_ai::{wrap, FixtureContext, FixtureMode, FixtureStore, GenerateRequest, LanguageModel};
//!
//! # async fn run(live: Arc<dyn LanguageModel>) -> Result<(), testworld_ai::ModelError> {
//! let store = FixtureStore::new("fixtures", 1_000);
//! let context = FixtureContext::general().with_use_case("UC-01");
//! let model = wrap(live, store, FixtureMode::Replay, context);
//! let reply = model.generate(&GenerateRequest::new("Create onboarding site for Alex")).await?;
//! println!("{}", reply.text);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod fixture;
pub mod model;
pub mod provider;
pub mod store;

// Re-exports
pub use error::ModelError;
pub use fixture::{
    fixture_id, normalize_prompt, AIFixture, FixtureContext, FixtureInput, FixtureMetadata,
    FixtureOutput,
};
pub use model::{EventStream, GenerateRequest, GenerateResponse, LanguageModel, StreamEvent, Usage};
pub use provider::{wrap, FixtureProvider};
pub use store::FixtureStore;
pub use testworld_core::FixtureMode;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for fixture-backed model calls
    pub use crate::{
        wrap, FixtureContext, FixtureMode, FixtureProvider, FixtureStore, GenerateRequest,
        GenerateResponse, LanguageModel, ModelError, StreamEvent,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
