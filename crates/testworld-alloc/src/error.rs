//! Error types for world allocation

use testworld_core::{RegistryError, WorldId};
use testworld_seed::SeedError;

/// Allocation errors
#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    /// Profile names an unknown or invalid definition
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Profile requires an admin user the definition does not declare
    #[error("seed type '{seed_type}' declares no admin user but the profile requires one")]
    AdminRequired { seed_type: String },

    /// Seeding failed; the partial world was cleaned up
    #[error("seeding world '{world}' failed: {source}")]
    Seed {
        world: WorldId,
        #[source]
        source: SeedError,
    },

    /// Cleanup at release failed; the world stays bound to its worker
    #[error("cleanup of world '{world}' failed: {source}")]
    Cleanup {
        world: WorldId,
        #[source]
        source: SeedError,
    },

    /// A world id could not be bound uniquely
    ///
    /// Indicates a broken locking discipline, never retried.
    #[error("allocation conflict: worker '{worker}' cannot bind world '{world}'")]
    Conflict { worker: String, world: WorldId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_display() {
        let err = AllocError::Conflict {
            worker: "3".into(),
            world: WorldId::new("w-1-3-00ff"),
        };
        assert_eq!(
            err.to_string(),
            "allocation conflict: worker '3' cannot bind world 'w-1-3-00ff'"
        );
    }
}
