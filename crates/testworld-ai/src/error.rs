//! Error types for model calls and fixture I/O

use testworld_fixtures::FixtureError;

/// Errors surfaced through [`crate::LanguageModel`]
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Underlying provider failed
    #[error("provider error: {0}")]
    Provider(String),

    /// Replay requested but nothing was recorded for this input
    #[error("no recorded fixture '{fixture_id}' for this input; record it first")]
    ReplayMiss { fixture_id: String },

    /// Live model exceeded the record deadline
    #[error("recording fixture '{fixture_id}' timed out after {timeout_ms}ms")]
    RecordTimeout { fixture_id: String, timeout_ms: u64 },

    /// Fixture file could not be read or written
    #[error(transparent)]
    Fixture(#[from] FixtureError),

    /// Fixture file exists but is not a valid fixture
    #[error("corrupt fixture '{path}': {message}")]
    Corrupt { path: String, message: String },
}

impl ModelError {
    /// Create provider error
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }

    /// Fixture id carried by replay and record failures
    #[must_use]
    pub fn fixture_id(&self) -> Option<&str> {
        match self {
            Self::ReplayMiss { fixture_id } | Self::RecordTimeout { fixture_id, .. } => {
                Some(fixture_id)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_miss_is_actionable() {
        let err = ModelError::ReplayMiss {
            fixture_id: "abc123".into(),
        };
        assert_eq!(
            err.to_string(),
            "no recorded fixture 'abc123' for this input; record it first"
        );
        assert_eq!(err.fixture_id(), Some("abc123"));
        assert_eq!(ModelError::provider("down").fixture_id(), None);
    }
}
