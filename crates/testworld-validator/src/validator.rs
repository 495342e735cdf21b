//! Offline world and fixture validation
//!
//! Every registered world is checked concurrently. Per-world findings are
//! collected without aborting the run; only the report decides pass/fail.

use crate::report::{Finding, FindingCode, ValidationReport, WorldReport};
use futures::future::join_all;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;
use testworld_core::{
    check_structure, RegistryError, TestWorldsConfig, ValidatorConfig, WorldDefinition, WorldId,
    WorldRegistry,
};
use testworld_fixtures::{check_format, ContentRole, FixtureError, FixtureLoader};
use testworld_seed::parse_message_fixture;

/// A fixture referenced by a world entity
#[derive(Debug, Clone, Copy)]
struct FixtureRef<'a> {
    test_id: &'a str,
    path: &'a str,
    role: ContentRole,
}

#[derive(Debug, Default)]
struct FixtureOutcome {
    errors: Vec<Finding>,
    warnings: Vec<Finding>,
}

/// Checks world definitions against the fixtures on disk
#[derive(Debug, Clone)]
pub struct WorldValidator {
    registry: Arc<WorldRegistry>,
    loader: FixtureLoader,
    limits: ValidatorConfig,
}

impl WorldValidator {
    /// Validator with default limits
    #[must_use]
    pub fn new(registry: Arc<WorldRegistry>, loader: FixtureLoader) -> Self {
        Self {
            registry,
            loader,
            limits: ValidatorConfig::default(),
        }
    }

    /// Validator over the configured fixture root and limits
    #[must_use]
    pub fn from_config(registry: Arc<WorldRegistry>, config: &TestWorldsConfig) -> Self {
        Self::new(registry, FixtureLoader::new(config.fixtures_root.clone()))
            .with_limits(config.validator.clone())
    }

    /// With size and count limits
    #[inline]
    #[must_use]
    pub fn with_limits(mut self, limits: ValidatorConfig) -> Self {
        self.limits = limits;
        self
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &WorldRegistry {
        &self.registry
    }

    /// Validate every registered world
    pub async fn validate_all(&self) -> ValidationReport {
        let started = Instant::now();
        let worlds = join_all(self.registry.iter().map(|def| self.check_world(def))).await;
        self.finish(worlds, started)
    }

    /// Validate the named worlds only
    ///
    /// # Errors
    /// - `RegistryError::UnknownWorld` if any id is unregistered; nothing
    ///   is checked in that case
    pub async fn validate_worlds<I, S>(&self, ids: I) -> Result<ValidationReport, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let started = Instant::now();
        let defs = ids
            .into_iter()
            .map(|id| self.registry.require(id.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let worlds = join_all(defs.into_iter().map(|def| self.check_world(def))).await;
        Ok(self.finish(worlds, started))
    }

    /// Validate one world
    ///
    /// # Errors
    /// - `RegistryError::UnknownWorld` if `id` is unregistered
    pub async fn validate_world(&self, id: &str) -> Result<WorldReport, RegistryError> {
        let def = self.registry.require(id)?;
        Ok(self.check_world(def).await)
    }

    fn finish(&self, worlds: Vec<WorldReport>, started: Instant) -> ValidationReport {
        let report = ValidationReport {
            worlds,
            fixtures_root: self.loader.root().display().to_string(),
            elapsed_ms: elapsed_ms(started),
        };
        tracing::info!(
            worlds = report.worlds.len(),
            errors = report.error_count(),
            warnings = report.warning_count(),
            elapsed_ms = report.elapsed_ms,
            "validation finished"
        );
        report
    }

    async fn check_world(&self, def: &WorldDefinition) -> WorldReport {
        let started = Instant::now();

        let mut errors: Vec<Finding> = check_structure(def)
            .into_iter()
            .map(|e| {
                let finding = Finding::new(FindingCode::Structural, e.to_string());
                match e.test_id() {
                    Some(test_id) => finding.with_test_id(test_id),
                    None => finding,
                }
            })
            .collect();
        errors.extend(self.check_dependencies(def));

        let fixtures = fixture_refs(def);
        let distinct: BTreeSet<&str> = fixtures.iter().map(|f| f.path).collect();
        let outcomes = join_all(
            fixtures
                .iter()
                .map(|fixture| self.check_fixture(def.id.as_str(), fixture)),
        )
        .await;

        let mut warnings = Vec::new();
        for outcome in outcomes {
            errors.extend(outcome.errors);
            warnings.extend(outcome.warnings);
        }
        if distinct.len() > self.limits.max_fixtures_per_world {
            warnings.push(Finding::new(
                FindingCode::TooManyFixtures,
                format!(
                    "world references {} fixtures, limit is {}",
                    distinct.len(),
                    self.limits.max_fixtures_per_world
                ),
            ));
        }

        let mut report = WorldReport::new(def.id.clone(), errors, warnings);
        report.fixtures_checked = distinct.len();
        report.elapsed_ms = elapsed_ms(started);

        if report.is_valid {
            tracing::debug!(world = %def.id, fixtures = report.fixtures_checked, "world valid");
        } else {
            tracing::warn!(world = %def.id, errors = report.errors.len(), "world failed validation");
        }
        report
    }

    fn check_dependencies(&self, def: &WorldDefinition) -> Vec<Finding> {
        let mut findings: Vec<Finding> = def
            .dependencies
            .iter()
            .filter(|dep| !self.registry.contains(dep.as_str()))
            .map(|dep| {
                Finding::new(
                    FindingCode::UnknownDependency,
                    format!("world '{}' depends on unknown world '{dep}'", def.id),
                )
            })
            .collect();

        if let Some(cycle) = find_cycle(&self.registry, &def.id) {
            let chain: Vec<&str> = cycle.iter().map(WorldId::as_str).collect();
            findings.push(Finding::new(
                FindingCode::DependencyCycle,
                format!("dependency cycle: {}", chain.join(" -> ")),
            ));
        }
        findings
    }

    async fn check_fixture(&self, world: &str, fixture: &FixtureRef<'_>) -> FixtureOutcome {
        let mut outcome = FixtureOutcome::default();
        let finding = |code: FindingCode, message: String| {
            Finding::new(code, message)
                .with_test_id(fixture.test_id)
                .with_path(fixture.path)
        };

        let bytes = match self.loader.load(world, fixture.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let code = match e {
                    FixtureError::InvalidPath(_) => FindingCode::InvalidPath,
                    _ => FindingCode::FixtureMissing,
                };
                outcome.errors.push(finding(code, e.to_string()));
                return outcome;
            }
        };

        let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        if size > self.limits.max_fixture_bytes {
            outcome.warnings.push(finding(
                FindingCode::OversizedFixture,
                format!(
                    "{} is {size} bytes, limit is {}",
                    fixture.path, self.limits.max_fixture_bytes
                ),
            ));
        }

        if let Err(e) = check_format(fixture.path, &bytes, fixture.role) {
            outcome.errors.push(finding(FindingCode::FixtureFormat, e.to_string()));
        } else if fixture.role == ContentRole::Messages {
            // Transcripts must parse exactly as the seeder parses them
            let parsed = std::str::from_utf8(&bytes)
                .map_err(|e| e.to_string())
                .and_then(|text| parse_message_fixture(text).map_err(|e| e.to_string()));
            if let Err(reason) = parsed {
                outcome.errors.push(finding(
                    FindingCode::FixtureFormat,
                    format!("{}: transcript would seed empty: {reason}", fixture.path),
                ));
            }
        }
        outcome
    }
}

/// Fixtures referenced by a world, artifacts first
fn fixture_refs(def: &WorldDefinition) -> Vec<FixtureRef<'_>> {
    let artifacts = def.artifacts.iter().filter_map(|a| {
        a.content_path.as_deref().map(|path| FixtureRef {
            test_id: &a.test_id,
            path,
            role: ContentRole::Artifact(a.kind),
        })
    });
    let chats = def.chats.iter().filter_map(|c| {
        c.messages_path.as_deref().map(|path| FixtureRef {
            test_id: &c.test_id,
            path,
            role: ContentRole::Messages,
        })
    });
    artifacts.chain(chats).collect()
}

/// Dependency chain leading from `start` back to itself, if any
fn find_cycle(registry: &WorldRegistry, start: &WorldId) -> Option<Vec<WorldId>> {
    let mut path = vec![start.clone()];
    let mut visited = HashSet::new();
    walk(registry, start, start, &mut path, &mut visited).then_some(path)
}

fn walk(
    registry: &WorldRegistry,
    start: &WorldId,
    current: &WorldId,
    path: &mut Vec<WorldId>,
    visited: &mut HashSet<WorldId>,
) -> bool {
    let Some(def) = registry.get(current.as_str()) else {
        return false;
    };
    for dep in &def.dependencies {
        if dep == start {
            path.push(dep.clone());
            return true;
        }
        if visited.insert(dep.clone()) {
            path.push(dep.clone());
            if walk(registry, start, dep, path, visited) {
                return true;
            }
            path.pop();
        }
    }
    false
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
