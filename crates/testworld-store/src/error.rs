//! Error types for the backing store

use testworld_core::{EntityKind, WorldId};

/// Backing-store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Primary key already present
    #[error("duplicate {kind} id: {id}")]
    DuplicateKey { kind: EntityKind, id: String },

    /// Row references a missing row, or deletion would orphan dependents
    #[error("foreign key violation: {kind} '{id}' -> {references} '{target}'")]
    ForeignKeyViolation {
        kind: EntityKind,
        id: String,
        references: EntityKind,
        target: String,
    },

    /// A query returned a row outside the caller's world
    ///
    /// Never recoverable: it means a read path skipped the world filter.
    #[error(
        "isolation violation: {kind} '{row_id}' tagged {row_world:?} visible to context {context_world:?}"
    )]
    IsolationViolation {
        kind: EntityKind,
        row_id: String,
        row_world: Option<WorldId>,
        context_world: Option<WorldId>,
    },

    /// Store returned a batch for a different table
    #[error("batch mismatch: expected {expected}, got {actual}")]
    BatchMismatch {
        expected: EntityKind,
        actual: EntityKind,
    },

    /// Backend failure (connection, constraint not modelled above, injected fault)
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether this error indicates a missing isolation filter
    #[inline]
    #[must_use]
    pub fn is_isolation_violation(&self) -> bool {
        matches!(self, Self::IsolationViolation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_key_display() {
        let err = StoreError::ForeignKeyViolation {
            kind: EntityKind::Artifact,
            id: "a1".to_string(),
            references: EntityKind::User,
            target: "u9".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "foreign key violation: artifact 'a1' -> user 'u9'"
        );
    }

    #[test]
    fn isolation_violation_flag() {
        let err = StoreError::IsolationViolation {
            kind: EntityKind::Chat,
            row_id: "c".to_string(),
            row_world: Some(WorldId::new("b")),
            context_world: Some(WorldId::new("a")),
        };
        assert!(err.is_isolation_violation());
        assert!(!StoreError::Backend("x".into()).is_isolation_violation());
    }
}
