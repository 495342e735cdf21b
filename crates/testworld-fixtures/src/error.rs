//! Error types for fixture loading

use crate::format::FixtureFormat;
use std::path::PathBuf;

/// Errors while resolving or reading fixture files
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// Referenced file does not exist or cannot be read
    #[error("fixture missing: {path}")]
    Missing { path: PathBuf },

    /// Relative path escapes the fixture root
    #[error("invalid fixture path '{0}': must be relative without '..'")]
    InvalidPath(String),

    /// IO error other than not-found
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File loads but fails its structural check
    #[error(transparent)]
    Format(#[from] FormatError),
}

impl FixtureError {
    /// Create IO error for path, mapping not-found to `Missing`
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::Missing { path }
        } else {
            Self::Io { path, source }
        }
    }

    /// Whether this is a missing-file error
    #[inline]
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }
}

/// Fixture content failed a type-specific structural check
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: invalid {format} fixture: {message}")]
pub struct FormatError {
    /// Path relative to the world directory
    pub path: String,
    /// Detected format
    pub format: FixtureFormat,
    /// What is wrong
    pub message: String,
}

impl FormatError {
    /// Create format error
    pub fn new(path: impl Into<String>, format: FixtureFormat, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            format,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_missing() {
        let err = FixtureError::from_io(
            "a/b.md",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_missing());
    }

    #[test]
    fn permission_denied_stays_io() {
        let err = FixtureError::from_io(
            "a/b.md",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no"),
        );
        assert!(matches!(err, FixtureError::Io { .. }));
    }

    #[test]
    fn format_error_display() {
        let err = FormatError::new("sites/x.json", FixtureFormat::Json, "missing 'blocks' array");
        assert_eq!(
            err.to_string(),
            "sites/x.json: invalid json fixture: missing 'blocks' array"
        );
    }
}
