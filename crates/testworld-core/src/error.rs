//! Error types for the world catalog
//!
//! Structural errors are fatal at validation time: a world that fails
//! [`crate::check_structure`] must never be seeded.

use crate::types::{EntityKind, WorldId};
use std::path::PathBuf;

/// A single structural defect in a world definition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    /// World declares no users
    #[error("world '{world}' declares no users")]
    NoUsers { world: WorldId },

    /// Two entities of the same kind share a test id
    #[error("world '{world}' declares {entity} '{test_id}' more than once")]
    DuplicateTestId {
        world: WorldId,
        entity: EntityKind,
        test_id: String,
    },

    /// Artifact or chat owner is not a declared user
    #[error("{entity} '{test_id}' in world '{world}' references unknown owner '{owner_id}'")]
    DanglingOwner {
        world: WorldId,
        entity: EntityKind,
        test_id: String,
        owner_id: String,
    },
}

impl StructuralError {
    /// Test id of the offending entity, if the error names one
    #[must_use]
    pub fn test_id(&self) -> Option<&str> {
        match self {
            Self::NoUsers { .. } => None,
            Self::DuplicateTestId { test_id, .. } | Self::DanglingOwner { test_id, .. } => {
                Some(test_id)
            }
        }
    }
}

/// Registry lookup and validation errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No world registered under id
    #[error("unknown world: '{0}'")]
    UnknownWorld(WorldId),

    /// World id registered twice
    #[error("world already registered: '{0}'")]
    DuplicateWorld(WorldId),

    /// Definition failed structural validation
    #[error("world '{world}' failed structural validation with {} error(s)", .errors.len())]
    Structural {
        world: WorldId,
        errors: Vec<StructuralError>,
    },
}

impl RegistryError {
    /// Structural errors carried by this error (empty for lookups)
    #[must_use]
    pub fn structural_errors(&self) -> &[StructuralError] {
        match self {
            Self::Structural { errors, .. } => errors,
            _ => &[],
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for the schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Environment override could not be parsed
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dangling_owner_display_names_entity() {
        let err = StructuralError::DanglingOwner {
            world: WorldId::new("w"),
            entity: EntityKind::Artifact,
            test_id: "doc-1".to_string(),
            owner_id: "user-missing".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "artifact 'doc-1' in world 'w' references unknown owner 'user-missing'"
        );
        assert_eq!(err.test_id(), Some("doc-1"));
    }

    #[test]
    fn registry_error_counts_structural_errors() {
        let err = RegistryError::Structural {
            world: WorldId::new("w"),
            errors: vec![StructuralError::NoUsers {
                world: WorldId::new("w"),
            }],
        };
        assert!(err.to_string().contains("1 error(s)"));
        assert_eq!(err.structural_errors().len(), 1);
        assert!(RegistryError::UnknownWorld(WorldId::new("x"))
            .structural_errors()
            .is_empty());
    }
}
