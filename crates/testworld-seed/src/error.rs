//! Error types for seeding and cleanup

use std::fmt;
use testworld_core::{EntityKind, RegistryError};
use testworld_fixtures::FixtureError;
use testworld_store::StoreError;

/// Result alias for seed operations
pub type Result<T> = std::result::Result<T, SeedError>;

/// Seeding phases, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedPhase {
    Users,
    Artifacts,
    Chats,
    Messages,
}

impl SeedPhase {
    /// All phases in execution order
    pub const ALL: [SeedPhase; 4] = [
        SeedPhase::Users,
        SeedPhase::Artifacts,
        SeedPhase::Chats,
        SeedPhase::Messages,
    ];

    /// Table written by this phase
    #[inline]
    #[must_use]
    pub fn kind(self) -> EntityKind {
        match self {
            SeedPhase::Users => EntityKind::User,
            SeedPhase::Artifacts => EntityKind::Artifact,
            SeedPhase::Chats => EntityKind::Chat,
            SeedPhase::Messages => EntityKind::Message,
        }
    }
}

impl fmt::Display for SeedPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SeedPhase::Users => "users",
            SeedPhase::Artifacts => "artifacts",
            SeedPhase::Chats => "chats",
            SeedPhase::Messages => "messages",
        })
    }
}

/// Seeding and cleanup errors
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    /// Definition unknown or structurally invalid
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Seeding was requested under the production context
    #[error("refusing to seed into production (no world id)")]
    Production,

    /// Fixture path invalid, or missing under the fail policy
    #[error("fixture for {entity} '{test_id}': {source}")]
    Fixture {
        entity: EntityKind,
        test_id: String,
        #[source]
        source: FixtureError,
    },

    /// A bulk write failed; earlier phases remain committed
    #[error("seed phase '{phase}' failed after committing [{}]: {source}", join(.completed))]
    PhaseFailed {
        phase: SeedPhase,
        completed: Vec<SeedPhase>,
        #[source]
        source: StoreError,
    },

    /// A cleanup delete failed; earlier tables were already emptied
    #[error("cleanup of {kind} rows failed: {source}")]
    Cleanup {
        kind: EntityKind,
        #[source]
        source: StoreError,
    },
}

impl SeedError {
    /// Phases committed before a phase failure
    #[must_use]
    pub fn completed_phases(&self) -> &[SeedPhase] {
        match self {
            Self::PhaseFailed { completed, .. } => completed,
            _ => &[],
        }
    }

    /// Whether rows may have been written before the error
    #[must_use]
    pub fn left_partial_world(&self) -> bool {
        !self.completed_phases().is_empty()
    }
}

fn join(phases: &[SeedPhase]) -> String {
    phases
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
