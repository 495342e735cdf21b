//! Validation report and renderers

use serde::{Deserialize, Serialize};
use std::fmt;
use testworld_core::WorldId;

/// What a finding is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingCode {
    /// Definition failed structural validation
    Structural,
    /// Referenced fixture does not exist or cannot be read
    FixtureMissing,
    /// Fixture path is absolute or escapes the root
    InvalidPath,
    /// Fixture content does not match its format or role
    FixtureFormat,
    /// Dependency names an unregistered world
    UnknownDependency,
    /// Dependency chain leads back to the world
    DependencyCycle,
    /// Fixture exceeds the configured size limit
    OversizedFixture,
    /// World references more fixtures than the configured limit
    TooManyFixtures,
}

impl fmt::Display for FindingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Structural => "structural",
            Self::FixtureMissing => "fixture-missing",
            Self::InvalidPath => "invalid-path",
            Self::FixtureFormat => "fixture-format",
            Self::UnknownDependency => "unknown-dependency",
            Self::DependencyCycle => "dependency-cycle",
            Self::OversizedFixture => "oversized-fixture",
            Self::TooManyFixtures => "too-many-fixtures",
        })
    }
}

/// One error or warning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Category
    pub code: FindingCode,
    /// Test id of the entity involved, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    /// World-relative fixture path, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Human-readable description
    pub message: String,
}

impl Finding {
    /// Create finding
    #[must_use]
    pub fn new(code: FindingCode, message: impl Into<String>) -> Self {
        Self {
            code,
            test_id: None,
            path: None,
            message: message.into(),
        }
    }

    /// With entity test id
    #[inline]
    #[must_use]
    pub fn with_test_id(mut self, test_id: impl Into<String>) -> Self {
        self.test_id = Some(test_id.into());
        self
    }

    /// With fixture path
    #[inline]
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Outcome for one world
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldReport {
    pub world_id: WorldId,
    /// No errors (warnings allowed)
    pub is_valid: bool,
    /// Errors in discovery order
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
    /// Distinct fixture files checked
    pub fixtures_checked: usize,
    pub elapsed_ms: u64,
}

impl WorldReport {
    /// Build from findings; validity follows from `errors`
    #[must_use]
    pub fn new(world_id: WorldId, errors: Vec<Finding>, warnings: Vec<Finding>) -> Self {
        Self {
            world_id,
            is_valid: errors.is_empty(),
            errors,
            warnings,
            fixtures_checked: 0,
            elapsed_ms: 0,
        }
    }

    /// Errors with the given code
    pub fn errors_of(&self, code: FindingCode) -> impl Iterator<Item = &Finding> {
        self.errors.iter().filter(move |f| f.code == code)
    }

    /// Warnings with the given code
    pub fn warnings_of(&self, code: FindingCode) -> impl Iterator<Item = &Finding> {
        self.warnings.iter().filter(move |f| f.code == code)
    }
}

/// Outcome for a validation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// Per-world results in registry order
    pub worlds: Vec<WorldReport>,
    /// Fixture root that was checked
    pub fixtures_root: String,
    pub elapsed_ms: u64,
}

impl ValidationReport {
    /// Whether every world is valid
    #[must_use]
    pub fn passed(&self) -> bool {
        self.worlds.iter().all(|w| w.is_valid)
    }

    /// Process exit code: 0 when passed, 1 otherwise
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.passed())
    }

    /// Result for one world
    #[must_use]
    pub fn world(&self, id: &str) -> Option<&WorldReport> {
        self.worlds.iter().find(|w| w.world_id.as_str() == id)
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.worlds.iter().map(|w| w.errors.len()).sum()
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.worlds.iter().map(|w| w.warnings.len()).sum()
    }

    /// One-line summary
    #[must_use]
    pub fn summary(&self) -> String {
        let valid = self.worlds.iter().filter(|w| w.is_valid).count();
        format!(
            "{valid}/{} worlds valid, {} error(s), {} warning(s) in {}ms",
            self.worlds.len(),
            self.error_count(),
            self.warning_count(),
            self.elapsed_ms
        )
    }

    /// Detailed text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut out = String::new();

        out.push_str("=== Test World Validation Report ===\n\n");
        out.push_str(&format!("Fixtures root: {}\n", self.fixtures_root));
        out.push_str(&format!("Worlds checked: {}\n", self.worlds.len()));
        out.push_str(&format!("Elapsed: {}ms\n\n", self.elapsed_ms));

        for world in &self.worlds {
            let status = if world.is_valid { "OK" } else { "INVALID" };
            out.push_str(&format!(
                "=== {} [{status}] ===\n  Fixtures checked: {}\n  Time: {}ms\n",
                world.world_id, world.fixtures_checked, world.elapsed_ms
            ));
            if !world.errors.is_empty() {
                out.push_str(&format!("  Errors ({}):\n", world.errors.len()));
                for (i, finding) in world.errors.iter().enumerate() {
                    out.push_str(&format!("    {}. {finding}\n", i + 1));
                }
            }
            if !world.warnings.is_empty() {
                out.push_str(&format!("  Warnings ({}):\n", world.warnings.len()));
                for (i, finding) in world.warnings.iter().enumerate() {
                    out.push_str(&format!("    {}. {finding}\n", i + 1));
                }
            }
            out.push('\n');
        }

        out.push_str(&format!("Summary: {}\n\n", self.summary()));
        if self.passed() {
            out.push_str("=== Result: PASS ===\n");
        } else {
            out.push_str("=== Result: FAIL ===\n");
        }

        out
    }

    /// Pretty-printed JSON
    ///
    /// # Errors
    /// - `serde_json::Error` if serialization fails
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ValidationReport {
        let bad = WorldReport::new(
            WorldId::new("broken"),
            vec![Finding::new(FindingCode::Structural, "doc-1 has no owner").with_test_id("doc-1")],
            vec![],
        );
        let good = WorldReport::new(
            WorldId::new("fine"),
            vec![],
            vec![Finding::new(FindingCode::OversizedFixture, "big").with_path("artifacts/big.md")],
        );
        ValidationReport {
            worlds: vec![good, bad],
            fixtures_root: "fixtures/worlds".into(),
            elapsed_ms: 3,
        }
    }

    #[test]
    fn warnings_do_not_fail() {
        let mut report = report();
        report.worlds.truncate(1);
        assert!(report.passed());
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn errors_fail_the_run() {
        let report = report();
        assert!(!report.passed());
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.summary(), "1/2 worlds valid, 1 error(s), 1 warning(s) in 3ms");
    }

    #[test]
    fn text_lists_numbered_findings() {
        let text = report().generate_text();
        assert!(text.contains("=== broken [INVALID] ==="));
        assert!(text.contains("    1. [structural] doc-1 has no owner"));
        assert!(text.contains("    1. [oversized-fixture] big"));
        assert!(text.ends_with("=== Result: FAIL ===\n"));
    }

    #[test]
    fn json_uses_camel_case_and_kebab_codes() {
        let json = report().to_json().unwrap();
        assert!(json.contains("\"isValid\": false"));
        assert!(json.contains("\"code\": \"structural\""));
        assert!(json.contains("\"testId\": \"doc-1\""));
        let back: ValidationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report());
    }
}
