//! Seed engine and cleanup
//!
//! Seeding writes one bulk batch per phase (users, artifacts, chats,
//! messages) in dependency order. Row ids are derived up front, so foreign
//! keys are known without reading anything back. Artifact and message
//! fixtures are all loaded, concurrently, before the first write.
//!
//! Phases are not wrapped in a transaction. A failed write aborts the seed
//! with [`SeedError::PhaseFailed`], which lists the phases already
//! committed; the caller decides whether to clean up and retry.

use crate::error::{Result, SeedError, SeedPhase};
use crate::ids::IdGenerator;
use crate::messages::{parse_message_fixture, FixtureMessage};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use testworld_core::{
    check_structure, EntityKind, RegistryError, WorldArtifact, WorldChat, WorldDefinition,
    WorldId, WorldRegistry,
};
use testworld_fixtures::{FixtureError, FixtureFormat, FixtureLoader, FormatError, LoadedContent};
use testworld_store::{
    tag, ArtifactRow, ChatRow, MessageRow, Row, UserRow, WorldContext, WorldFilter, WorldStore,
};

/// What to do when a declared fixture file is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingFixturePolicy {
    /// Substitute a placeholder and warn
    #[default]
    Placeholder,
    /// Abort the seed with [`SeedError::Fixture`]
    Fail,
}

/// Row count and wall time of one phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseStats {
    pub count: usize,
    pub elapsed_ms: u64,
}

/// Outcome of seeding one world
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedResult {
    /// World the rows were tagged with
    pub world_id: WorldId,
    /// Definition that was materialized
    pub definition_id: WorldId,
    pub users: PhaseStats,
    pub artifacts: PhaseStats,
    pub chats: PhaseStats,
    pub messages: PhaseStats,
    pub user_ids: Vec<String>,
    pub artifact_ids: Vec<String>,
    pub chat_ids: Vec<String>,
    pub message_ids: Vec<String>,
    /// Test ids of artifacts whose content is a placeholder
    pub synthesized: Vec<String>,
    /// Test ids of chats seeded empty because their transcript was unusable
    pub dropped_chats: Vec<String>,
    pub total_ms: u64,
}

impl SeedResult {
    fn new(world_id: WorldId, definition_id: WorldId) -> Self {
        Self {
            world_id,
            definition_id,
            users: PhaseStats::default(),
            artifacts: PhaseStats::default(),
            chats: PhaseStats::default(),
            messages: PhaseStats::default(),
            user_ids: Vec::new(),
            artifact_ids: Vec::new(),
            chat_ids: Vec::new(),
            message_ids: Vec::new(),
            synthesized: Vec::new(),
            dropped_chats: Vec::new(),
            total_ms: 0,
        }
    }

    /// Stats of one phase
    #[must_use]
    pub fn stats(&self, phase: SeedPhase) -> PhaseStats {
        match phase {
            SeedPhase::Users => self.users,
            SeedPhase::Artifacts => self.artifacts,
            SeedPhase::Chats => self.chats,
            SeedPhase::Messages => self.messages,
        }
    }

    /// Rows written to the table of `kind`
    #[must_use]
    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::User => self.users.count,
            EntityKind::Artifact => self.artifacts.count,
            EntityKind::Chat => self.chats.count,
            EntityKind::Message => self.messages.count,
            EntityKind::Suggestion => 0,
        }
    }

    /// Rows written across all tables
    #[must_use]
    pub fn total_rows(&self) -> usize {
        SeedPhase::ALL.iter().map(|p| self.stats(*p).count).sum()
    }
}

/// Rows removed by [`SeedEngine::cleanup`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub world_id: WorldId,
    /// Deleted rows per table, every table present
    pub deleted: BTreeMap<EntityKind, u64>,
    pub elapsed_ms: u64,
}

impl CleanupReport {
    /// Rows deleted across all tables
    #[must_use]
    pub fn total(&self) -> u64 {
        self.deleted.values().sum()
    }

    /// Whether the world was already empty
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.total() == 0
    }
}

/// Materializes world definitions into a [`WorldStore`]
pub struct SeedEngine {
    store: Arc<dyn WorldStore>,
    loader: FixtureLoader,
    registry: Arc<WorldRegistry>,
    policy: MissingFixturePolicy,
    session: i64,
}

impl std::fmt::Debug for SeedEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedEngine")
            .field("fixtures_root", &self.loader.root())
            .field("worlds", &self.registry.len())
            .field("policy", &self.policy)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl SeedEngine {
    /// Create engine; the session timestamp is the current time
    #[must_use]
    pub fn new(
        store: Arc<dyn WorldStore>,
        loader: FixtureLoader,
        registry: Arc<WorldRegistry>,
    ) -> Self {
        Self {
            store,
            loader,
            registry,
            policy: MissingFixturePolicy::default(),
            session: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// With missing-fixture policy
    #[inline]
    #[must_use]
    pub fn with_policy(mut self, policy: MissingFixturePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// With fixed session timestamp (unix ms)
    #[inline]
    #[must_use]
    pub fn with_session(mut self, session: i64) -> Self {
        self.session = session;
        self
    }

    /// Registry definitions are looked up in
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &WorldRegistry {
        &self.registry
    }

    /// Backing store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn WorldStore> {
        &self.store
    }

    /// Seed definition `definition_id` into world `world`
    ///
    /// # Errors
    /// - `SeedError::Registry` if the definition is unknown or invalid
    /// - `SeedError::Fixture` on an escaping path, or a missing file or
    ///   unparseable transcript under [`MissingFixturePolicy::Fail`]
    /// - `SeedError::PhaseFailed` if a bulk write fails
    pub async fn seed(&self, world: &WorldId, definition_id: &str) -> Result<SeedResult> {
        let def = self.registry.validate(definition_id)?;
        self.seed_in(&WorldContext::for_world(world.clone()), def).await
    }

    /// Seed `def` into the world of `context`
    ///
    /// # Errors
    /// - `SeedError::Production` if `context` has no world
    /// - otherwise as for [`Self::seed`]
    pub async fn seed_in(&self, context: &WorldContext, def: &WorldDefinition) -> Result<SeedResult> {
        let Some(world) = context.world_id() else {
            return Err(SeedError::Production);
        };
        let errors = check_structure(def);
        if !errors.is_empty() {
            return Err(RegistryError::Structural {
                world: def.id.clone(),
                errors,
            }
            .into());
        }

        let started = Instant::now();
        let ids = IdGenerator::new(self.session, world.clone());
        let mut result = SeedResult::new(world.clone(), def.id.clone());
        let mut completed = Vec::with_capacity(SeedPhase::ALL.len());

        tracing::debug!(world = %world, definition = %def.id, "seeding world");

        // All fixtures load before the first write
        let (contents, transcripts) = futures::try_join!(
            try_join_all(def.artifacts.iter().map(|a| self.load_artifact(def, a))),
            try_join_all(def.chats.iter().map(|c| self.load_messages(def, c))),
        )?;

        // Users
        let phase_start = Instant::now();
        let user_rows: Vec<UserRow> = def
            .users
            .iter()
            .enumerate()
            .map(|(i, u)| {
                let mut row = UserRow::new(ids.id_for(EntityKind::User, &u.test_id, i), &u.name, &u.email);
                row.role = u.role;
                tag(row, context)
            })
            .collect();
        let owners: HashMap<&str, String> = def
            .users
            .iter()
            .zip(&user_rows)
            .map(|(u, row)| (u.test_id.as_str(), row.id.clone()))
            .collect();
        result.user_ids = self.write_phase(SeedPhase::Users, user_rows, &mut completed).await?;
        result.users = phase_stats(result.user_ids.len(), phase_start);

        // Artifacts
        let phase_start = Instant::now();
        let mut artifact_rows = Vec::with_capacity(def.artifacts.len());
        for (i, (artifact, content)) in def.artifacts.iter().zip(contents).enumerate() {
            if content.is_placeholder() {
                result.synthesized.push(artifact.test_id.clone());
            }
            let mut row = ArtifactRow::new(
                ids.id_for(EntityKind::Artifact, &artifact.test_id, i),
                owner_row_id(&owners, &artifact.owner_id),
                &artifact.title,
                artifact.kind,
                content.text,
            );
            row.tags.clone_from(&artifact.tags);
            artifact_rows.push(tag(row, context));
        }
        result.artifact_ids = self
            .write_phase(SeedPhase::Artifacts, artifact_rows, &mut completed)
            .await?;
        result.artifacts = phase_stats(result.artifact_ids.len(), phase_start);

        // Chats
        let phase_start = Instant::now();
        let chat_rows: Vec<ChatRow> = def
            .chats
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let row = ChatRow::new(
                    ids.id_for(EntityKind::Chat, &c.test_id, i),
                    owner_row_id(&owners, &c.owner_id),
                    &c.title,
                );
                tag(row, context)
            })
            .collect();
        let chat_row_ids: Vec<String> = chat_rows.iter().map(|r| r.id.clone()).collect();
        result.chat_ids = self.write_phase(SeedPhase::Chats, chat_rows, &mut completed).await?;
        result.chats = phase_stats(result.chat_ids.len(), phase_start);

        // Messages
        let phase_start = Instant::now();
        let mut message_rows = Vec::new();
        for ((chat, chat_id), transcript) in def.chats.iter().zip(&chat_row_ids).zip(transcripts) {
            let Some(messages) = transcript else {
                result.dropped_chats.push(chat.test_id.clone());
                continue;
            };
            for (ordinal, message) in messages.into_iter().enumerate() {
                let key = format!("{}#{ordinal}", chat.test_id);
                let row = MessageRow::new(
                    ids.id_for(EntityKind::Message, &key, ordinal),
                    chat_id,
                    message.role,
                    message.parts,
                    u32::try_from(ordinal).unwrap_or(u32::MAX),
                );
                message_rows.push(tag(row, context));
            }
        }
        result.message_ids = self
            .write_phase(SeedPhase::Messages, message_rows, &mut completed)
            .await?;
        result.messages = phase_stats(result.message_ids.len(), phase_start);

        result.total_ms = elapsed_ms(started);
        tracing::info!(
            world = %world,
            definition = %def.id,
            users = result.users.count,
            artifacts = result.artifacts.count,
            chats = result.chats.count,
            messages = result.messages.count,
            synthesized = result.synthesized.len(),
            dropped_chats = result.dropped_chats.len(),
            elapsed_ms = result.total_ms,
            "world seeded"
        );
        Ok(result)
    }

    /// Delete every row tagged with `world`, dependents first
    ///
    /// Safe to call repeatedly; an empty world yields a report of zeros.
    ///
    /// # Errors
    /// - `SeedError::Cleanup` naming the table whose delete failed
    pub async fn cleanup(&self, world: &WorldId) -> Result<CleanupReport> {
        let started = Instant::now();
        let filter = WorldFilter::world(world.clone());
        let mut deleted = BTreeMap::new();

        for kind in EntityKind::CLEANUP_ORDER {
            let count = self
                .store
                .bulk_delete(kind, &filter)
                .await
                .map_err(|source| SeedError::Cleanup { kind, source })?;
            deleted.insert(kind, count);
        }

        let report = CleanupReport {
            world_id: world.clone(),
            deleted,
            elapsed_ms: elapsed_ms(started),
        };
        if report.is_noop() {
            tracing::debug!(world = %world, "cleanup found nothing to delete");
        } else {
            tracing::info!(world = %world, rows = report.total(), "world cleaned up");
        }
        Ok(report)
    }

    async fn write_phase<R: Row>(
        &self,
        phase: SeedPhase,
        rows: Vec<R>,
        completed: &mut Vec<SeedPhase>,
    ) -> Result<Vec<String>> {
        if rows.is_empty() {
            completed.push(phase);
            return Ok(Vec::new());
        }
        let ids = self
            .store
            .bulk_insert(R::into_batch(rows))
            .await
            .map_err(|source| {
                tracing::warn!(%phase, committed = completed.len(), error = %source, "seed phase failed");
                SeedError::PhaseFailed {
                    phase,
                    completed: completed.clone(),
                    source,
                }
            })?;
        completed.push(phase);
        Ok(ids)
    }

    async fn load_artifact(&self, def: &WorldDefinition, artifact: &WorldArtifact) -> Result<LoadedContent> {
        let fixture_error = |source: FixtureError| SeedError::Fixture {
            entity: EntityKind::Artifact,
            test_id: artifact.test_id.clone(),
            source,
        };
        let world = def.id.as_str();
        let path = artifact.content_path.as_deref();

        if let (MissingFixturePolicy::Fail, Some(relative)) = (self.policy, path) {
            self.loader.load(world, relative).await.map_err(fixture_error)?;
        }
        self.loader
            .load_or_placeholder(world, path, artifact.kind)
            .await
            .map_err(fixture_error)
    }

    /// `None` means the transcript was unusable and the chat is seeded empty
    async fn load_messages(&self, def: &WorldDefinition, chat: &WorldChat) -> Result<Option<Vec<FixtureMessage>>> {
        let Some(relative) = chat.messages_path.as_deref() else {
            return Ok(Some(Vec::new()));
        };
        let fixture_error = |source: FixtureError| SeedError::Fixture {
            entity: EntityKind::Chat,
            test_id: chat.test_id.clone(),
            source,
        };

        let bytes = match self.loader.load(def.id.as_str(), relative).await {
            Ok(bytes) => bytes,
            Err(e @ FixtureError::InvalidPath(_)) => return Err(fixture_error(e)),
            Err(e) if self.policy == MissingFixturePolicy::Fail => return Err(fixture_error(e)),
            Err(e) => {
                tracing::warn!(world = %def.id, chat = %chat.test_id, error = %e, "message fixture unavailable, seeding empty chat");
                return Ok(None);
            }
        };

        let parsed = std::str::from_utf8(&bytes)
            .map_err(|e| e.to_string())
            .and_then(|text| parse_message_fixture(text).map_err(|e| e.to_string()));
        match parsed {
            Ok(messages) => Ok(Some(messages)),
            Err(reason) if self.policy == MissingFixturePolicy::Fail => Err(fixture_error(
                FormatError::new(relative, FixtureFormat::from_path(relative), reason).into(),
            )),
            Err(reason) => {
                tracing::warn!(world = %def.id, chat = %chat.test_id, %reason, "message fixture unreadable, seeding empty chat");
                Ok(None)
            }
        }
    }
}

// Owners are checked by check_structure before any row is built; an
// unresolved owner falls through to the store's foreign-key check.
fn owner_row_id(owners: &HashMap<&str, String>, owner: &str) -> String {
    owners.get(owner).cloned().unwrap_or_else(|| owner.to_string())
}

fn phase_stats(count: usize, started: Instant) -> PhaseStats {
    PhaseStats {
        count,
        elapsed_ms: elapsed_ms(started),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
