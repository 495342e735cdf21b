//! Per-test-file seed profiles
//!
//! A test file is matched against profile patterns by prefix of its file
//! name (directories are ignored). The longest matching pattern wins; a
//! file matching nothing gets the default profile.

use std::time::Duration;
use testworld_core::{catalog, SeedProfileConfig, TestWorldsConfig};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// What to seed for a test file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedProfile {
    /// World definition id
    pub seed_type: String,
    /// Seeding slower than this is reported
    pub timeout: Duration,
    /// Allocation fails unless the definition declares an admin
    pub requires_admin: bool,
}

impl SeedProfile {
    /// Profile seeding `seed_type` with the default timeout
    #[must_use]
    pub fn new(seed_type: impl Into<String>) -> Self {
        Self {
            seed_type: seed_type.into(),
            timeout: DEFAULT_TIMEOUT,
            requires_admin: false,
        }
    }

    /// With timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Require an admin user in the seeded world
    #[inline]
    #[must_use]
    pub fn admin(mut self) -> Self {
        self.requires_admin = true;
        self
    }
}

impl From<&SeedProfileConfig> for SeedProfile {
    fn from(config: &SeedProfileConfig) -> Self {
        Self {
            seed_type: config.seed_type.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
            requires_admin: config.requires_admin,
        }
    }
}

/// Prefix table from test file to [`SeedProfile`]
#[derive(Debug, Clone)]
pub struct ProfileTable {
    entries: Vec<(String, SeedProfile)>,
    default: SeedProfile,
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self::new(SeedProfile::new(catalog::SOLO_WRITER))
    }
}

impl ProfileTable {
    /// Empty table with a default profile
    #[inline]
    #[must_use]
    pub fn new(default: SeedProfile) -> Self {
        Self {
            entries: Vec::new(),
            default,
        }
    }

    /// Profiles for the use-case suites shipped with the builtin catalog
    #[must_use]
    pub fn builtin() -> Self {
        Self::default()
            .with_profile("UC-01", SeedProfile::new(catalog::SITE_BUILDER))
            .with_profile("UC-02", SeedProfile::new(catalog::CONTENT_CREATOR))
            .with_profile("UC-03", SeedProfile::new(catalog::TEAM_COLLAB))
            .with_profile("admin", SeedProfile::new(catalog::ADMIN_CONSOLE).admin())
    }

    /// Build from configuration
    #[must_use]
    pub fn from_config(config: &TestWorldsConfig) -> Self {
        config.profiles.iter().fold(
            Self::new(SeedProfile::new(config.default_seed_type.clone())),
            |table, p| table.with_profile(p.pattern.clone(), SeedProfile::from(p)),
        )
    }

    /// Add or replace the profile for `pattern`
    #[must_use]
    pub fn with_profile(mut self, pattern: impl Into<String>, profile: SeedProfile) -> Self {
        let pattern = pattern.into();
        self.entries.retain(|(p, _)| *p != pattern);
        self.entries.push((pattern, profile));
        self
    }

    /// Default profile
    #[inline]
    #[must_use]
    pub fn default_profile(&self) -> &SeedProfile {
        &self.default
    }

    /// Profile for a test file
    #[must_use]
    pub fn lookup(&self, test_file: &str) -> &SeedProfile {
        let name = file_name(test_file);
        self.entries
            .iter()
            .filter(|(pattern, _)| name.starts_with(pattern.as_str()))
            .max_by_key(|(pattern, _)| pattern.len())
            .map_or(&self.default, |(_, profile)| profile)
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
