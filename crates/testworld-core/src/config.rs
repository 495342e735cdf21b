//! Configuration
//!
//! [`TestWorldsConfig`] is read from a TOML file and then overridden from
//! the environment. Every field has a default, so an empty file (or no file)
//! yields a usable configuration.
//!
//! ```toml
//! fixtures_root = "fixtures/worlds"
//!
//! [ai]
//! mode = "replay"
//! record_timeout_ms = 30000
//!
//! [[profiles]]
//! pattern = "UC-01"
//! seed_type = "site-builder"
//! timeout_ms = 20000
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable overriding `fixtures_root`
pub const ENV_FIXTURES_ROOT: &str = "TESTWORLD_FIXTURES_ROOT";
/// Environment variable overriding `ai.mode`
pub const ENV_AI_MODE: &str = "TESTWORLD_AI_MODE";
/// Environment variable overriding `ai.record_timeout_ms`
pub const ENV_RECORD_TIMEOUT_MS: &str = "TESTWORLD_RECORD_TIMEOUT_MS";

/// How the AI fixture provider treats model calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixtureMode {
    /// Call the live model, record nothing
    #[default]
    Passthrough,
    /// Call the live model and persist the result
    Record,
    /// Serve recorded results only
    Replay,
}

impl FixtureMode {
    /// Stable lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FixtureMode::Passthrough => "passthrough",
            FixtureMode::Record => "record",
            FixtureMode::Replay => "replay",
        }
    }
}

impl fmt::Display for FixtureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FixtureMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passthrough" => Ok(FixtureMode::Passthrough),
            "record" => Ok(FixtureMode::Record),
            "replay" => Ok(FixtureMode::Replay),
            _ => Err(ConfigError::InvalidValue {
                key: ENV_AI_MODE.to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// AI fixture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Root under which `ai/{scope}/{id}.json` fixtures live
    pub fixtures_root: PathBuf,
    /// Provider mode
    pub mode: FixtureMode,
    /// Deadline for live calls in record mode
    pub record_timeout_ms: u64,
    /// Characters per replayed stream delta
    pub stream_chunk_chars: usize,
    /// Delay between replayed stream deltas
    pub stream_pacing_ms: u64,
    /// In-process fixture cache capacity
    pub cache_capacity: u64,
}

impl AiConfig {
    /// Record deadline as duration
    #[inline]
    #[must_use]
    pub fn record_timeout(&self) -> Duration {
        Duration::from_millis(self.record_timeout_ms)
    }

    /// Stream pacing as duration
    #[inline]
    #[must_use]
    pub fn stream_pacing(&self) -> Duration {
        Duration::from_millis(self.stream_pacing_ms)
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            fixtures_root: PathBuf::from("fixtures"),
            mode: FixtureMode::Passthrough,
            record_timeout_ms: 30_000,
            stream_chunk_chars: 16,
            stream_pacing_ms: 10,
            cache_capacity: 1_000,
        }
    }
}

/// Validator thresholds (advisory findings)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Fixtures larger than this produce a warning
    pub max_fixture_bytes: u64,
    /// Worlds referencing more fixtures than this produce a warning
    pub max_fixtures_per_world: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_fixture_bytes: 1024 * 1024,
            max_fixtures_per_world: 50,
        }
    }
}

/// Seed profile for test files whose name starts with `pattern`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedProfileConfig {
    /// Test file name prefix
    pub pattern: String,
    /// World definition to seed
    pub seed_type: String,
    /// Seeding budget
    #[serde(default = "default_seed_timeout_ms")]
    pub timeout_ms: u64,
    /// Whether the seeded world must declare an admin user
    #[serde(default)]
    pub requires_admin: bool,
}

fn default_seed_timeout_ms() -> u64 {
    30_000
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestWorldsConfig {
    /// Root of `{world_id}/{relative_path}` seed fixtures
    pub fixtures_root: PathBuf,
    /// AI fixture provider settings
    pub ai: AiConfig,
    /// Validator thresholds
    pub validator: ValidatorConfig,
    /// World seeded for test files matching no profile
    pub default_seed_type: String,
    /// Per-test-file seed profiles
    pub profiles: Vec<SeedProfileConfig>,
}

impl Default for TestWorldsConfig {
    fn default() -> Self {
        Self {
            fixtures_root: PathBuf::from("fixtures/worlds"),
            ai: AiConfig::default(),
            validator: ValidatorConfig::default(),
            default_seed_type: crate::catalog::SOLO_WRITER.to_string(),
            profiles: Vec::new(),
        }
    }
}

impl TestWorldsConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// - `ConfigError::Parse` on malformed TOML or unknown value types
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from file, then apply environment overrides
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - `ConfigError::Parse` / `ConfigError::InvalidValue` on bad content
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded test worlds config");
        Self::from_toml_str(&text)?.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Defaults plus environment overrides
    ///
    /// # Errors
    /// - `ConfigError::InvalidValue` on unparseable overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup
    ///
    /// # Errors
    /// - `ConfigError::InvalidValue` on unparseable overrides
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(ENV_FIXTURES_ROOT) {
            self.fixtures_root = PathBuf::from(root);
        }
        if let Some(mode) = lookup(ENV_AI_MODE) {
            self.ai.mode = mode.parse()?;
        }
        if let Some(ms) = lookup(ENV_RECORD_TIMEOUT_MS) {
            self.ai.record_timeout_ms = ms.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_RECORD_TIMEOUT_MS.to_string(),
                value: ms.clone(),
            })?;
        }
        Ok(self)
    }
}
