//! World allocator
//!
//! Binds each parallel test worker to one freshly seeded world:
//! - First request per worker mints a world id, seeds it, records it
//! - Later requests only append the test file
//! - Release cleans the world up and frees the worker
//!
//! Each worker has its own async slot, so mint-seed-record is atomic per
//! worker while different workers seed concurrently. The active-world set
//! guarantees no world id is ever bound to two workers.

use crate::error::AllocError;
use crate::profile::ProfileTable;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use testworld_core::WorldId;
use testworld_seed::{CleanupReport, SeedEngine, SeedResult};
use tokio::sync::Mutex;

const MINT_ATTEMPTS: usize = 8;

/// World bound to one worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerWorldInfo {
    pub worker_id: String,
    pub world_id: WorldId,
    /// Definition that was seeded
    pub seed_type: String,
    /// Test files served by this world, in request order
    pub assigned_tests: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub seed_result: SeedResult,
}

type Slot = Arc<Mutex<Option<WorkerWorldInfo>>>;

/// Per-worker world allocation service
pub struct WorldAllocator {
    engine: Arc<SeedEngine>,
    profiles: ProfileTable,
    session: i64,
    workers: DashMap<String, Slot>,
    active: parking_lot::Mutex<HashSet<WorldId>>,
}

impl std::fmt::Debug for WorldAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldAllocator")
            .field("session", &self.session)
            .field("workers", &self.workers.len())
            .field("active", &self.active.lock().len())
            .finish_non_exhaustive()
    }
}

impl WorldAllocator {
    /// Create allocator; the session timestamp is the current time
    #[must_use]
    pub fn new(engine: Arc<SeedEngine>, profiles: ProfileTable) -> Self {
        Self {
            engine,
            profiles,
            session: Utc::now().timestamp_millis(),
            workers: DashMap::new(),
            active: parking_lot::Mutex::new(HashSet::new()),
        }
    }

    /// With fixed session timestamp (unix ms)
    #[inline]
    #[must_use]
    pub fn with_session(mut self, session: i64) -> Self {
        self.session = session;
        self
    }

    /// Seed engine used for seeding and cleanup
    #[inline]
    #[must_use]
    pub fn engine(&self) -> &Arc<SeedEngine> {
        &self.engine
    }

    /// Return the world bound to `worker`, seeding one on first use
    ///
    /// # Errors
    /// - `AllocError::Registry` if the profile's seed type is unknown or invalid
    /// - `AllocError::AdminRequired` if the profile needs an admin the
    ///   definition lacks
    /// - `AllocError::Seed` if seeding failed (the partial world is removed)
    /// - `AllocError::Conflict` if no unique world id could be bound
    pub async fn allocate(&self, worker: &str, test_file: &str) -> Result<WorkerWorldInfo, AllocError> {
        let slot = self.slot(worker);
        let mut guard = slot.lock().await;

        if let Some(info) = guard.as_mut() {
            if !info.assigned_tests.iter().any(|t| t == test_file) {
                info.assigned_tests.push(test_file.to_string());
            }
            tracing::debug!(worker, world = %info.world_id, test_file, "reusing worker world");
            return Ok(info.clone());
        }

        let profile = self.profiles.lookup(test_file).clone();
        let definition = self.engine.registry().validate(&profile.seed_type)?;
        if profile.requires_admin && !definition.has_admin() {
            return Err(AllocError::AdminRequired {
                seed_type: profile.seed_type,
            });
        }

        let world = self.mint(worker)?;
        let started = Instant::now();
        let seed_result = match self.engine.seed(&world, &profile.seed_type).await {
            Ok(result) => result,
            Err(source) => {
                tracing::warn!(worker, world = %world, error = %source, "seeding failed, removing partial world");
                if let Err(e) = self.engine.cleanup(&world).await {
                    tracing::error!(world = %world, error = %e, "cleanup of partial world failed");
                }
                self.active.lock().remove(&world);
                self.forget_if_idle(worker, &slot);
                return Err(AllocError::Seed { world, source });
            }
        };

        let elapsed = started.elapsed();
        if elapsed > profile.timeout {
            tracing::warn!(
                worker,
                world = %world,
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                budget_ms = u64::try_from(profile.timeout.as_millis()).unwrap_or(u64::MAX),
                "seeding exceeded profile timeout"
            );
        }

        let info = WorkerWorldInfo {
            worker_id: worker.to_string(),
            world_id: world,
            seed_type: profile.seed_type,
            assigned_tests: vec![test_file.to_string()],
            is_active: true,
            created_at: Utc::now(),
            seed_result,
        };
        tracing::info!(worker, world = %info.world_id, seed_type = %info.seed_type, "world allocated");
        *guard = Some(info.clone());
        Ok(info)
    }

    /// Clean up and unbind the world of `worker`
    ///
    /// Returns `None` when nothing was allocated. Worlds whose definition
    /// disables auto-cleanup are unbound without deleting rows, also
    /// returning `None`. The worker's entry is removed either way.
    ///
    /// # Errors
    /// - `AllocError::Cleanup` if deletion failed; the binding is kept
    pub async fn release(&self, worker: &str) -> Result<Option<CleanupReport>, AllocError> {
        Ok(self.unbind(worker).await?.and_then(|(_, report)| report))
    }

    /// Release every worker
    ///
    /// All workers are attempted; returns how many had a world bound.
    ///
    /// # Errors
    /// - The first `AllocError::Cleanup` encountered
    pub async fn release_all(&self) -> Result<usize, AllocError> {
        let workers: Vec<String> = self.workers.iter().map(|e| e.key().clone()).collect();
        let mut released = 0;
        let mut first_error = None;
        for worker in workers {
            match self.unbind(&worker).await {
                Ok(Some(_)) => released += 1,
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(worker = %worker, error = %e, "release failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(released), Err)
    }

    /// World currently bound to `worker`
    pub async fn world_for(&self, worker: &str) -> Option<WorldId> {
        let slot = self.workers.get(worker).map(|s| Arc::clone(s.value()))?;
        let guard = slot.lock().await;
        guard.as_ref().map(|info| info.world_id.clone())
    }

    /// Bindings of all workers, sorted by worker id
    pub async fn snapshot(&self) -> Vec<WorkerWorldInfo> {
        let slots: Vec<Slot> = self.workers.iter().map(|e| Arc::clone(e.value())).collect();
        let mut infos = Vec::with_capacity(slots.len());
        for slot in slots {
            if let Some(info) = slot.lock().await.as_ref() {
                infos.push(info.clone());
            }
        }
        infos.sort_by(|a, b| a.worker_id.cmp(&b.worker_id));
        infos
    }

    /// Ids of all bound worlds
    #[must_use]
    pub fn active_worlds(&self) -> Vec<WorldId> {
        let mut worlds: Vec<WorldId> = self.active.lock().iter().cloned().collect();
        worlds.sort();
        worlds
    }

    /// Workers with a registry entry
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Unbind `worker`, returning the released world and its cleanup report
    async fn unbind(&self, worker: &str) -> Result<Option<(WorldId, Option<CleanupReport>)>, AllocError> {
        let Some(slot) = self.workers.get(worker).map(|s| Arc::clone(s.value())) else {
            return Ok(None);
        };
        let mut guard = slot.lock().await;
        let Some(info) = guard.as_ref() else {
            self.forget_if_idle(worker, &slot);
            return Ok(None);
        };
        let world = info.world_id.clone();

        let auto_cleanup = self
            .engine
            .registry()
            .get(&info.seed_type)
            .map_or(true, |def| def.settings.auto_cleanup);

        let report = if auto_cleanup {
            let report = self
                .engine
                .cleanup(&world)
                .await
                .map_err(|source| AllocError::Cleanup {
                    world: world.clone(),
                    source,
                })?;
            Some(report)
        } else {
            tracing::info!(worker, world = %world, "auto-cleanup disabled, leaving rows in place");
            None
        };

        *guard = None;
        self.active.lock().remove(&world);
        self.forget_if_idle(worker, &slot);
        tracing::info!(worker, world = %world, "world released");
        Ok(Some((world, report)))
    }

    /// Drop the entry of `worker` unless another request holds its slot
    ///
    /// Runs under the map's shard lock, so no new handle to `slot` can be
    /// taken while the count is checked. The map and the caller hold one
    /// reference each.
    fn forget_if_idle(&self, worker: &str, slot: &Slot) {
        self.workers
            .remove_if(worker, |_, current| Arc::ptr_eq(current, slot) && Arc::strong_count(current) == 2);
    }

    fn slot(&self, worker: &str) -> Slot {
        Arc::clone(self.workers.entry(worker.to_string()).or_default().value())
    }

    fn mint(&self, worker: &str) -> Result<WorldId, AllocError> {
        let worker_part = sanitize(worker);
        let mut active = self.active.lock();
        let mut candidate = WorldId::new(String::new());
        for _ in 0..MINT_ATTEMPTS {
            let suffix: u32 = rand::random();
            candidate = WorldId::new(format!("w-{}-{worker_part}-{suffix:08x}", self.session));
            if active.insert(candidate.clone()) {
                return Ok(candidate);
            }
            tracing::warn!(worker, world = %candidate, "minted world id already active, retrying");
        }
        Err(AllocError::Conflict {
            worker: worker.to_string(),
            world: candidate,
        })
    }
}

// World ids travel in signed tokens, which accept [A-Za-z0-9_-] only.
fn sanitize(worker: &str) -> String {
    worker
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
