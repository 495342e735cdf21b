//! In-memory backing store
//!
//! Enforces primary keys and restrict-on-delete foreign keys the way the
//! production schema does, so seeding and cleanup order bugs surface in
//! tests. Supports one-shot fault injection per table.

use crate::context::WorldFilter;
use crate::error::StoreError;
use crate::rows::{
    ArtifactRow, ChatRow, MessageRow, Row, RowBatch, SuggestionRow, UserRow, WorldScoped,
};
use crate::store::WorldStore;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use testworld_core::EntityKind;

#[derive(Debug, Default)]
struct Tables {
    users: Vec<UserRow>,
    artifacts: Vec<ArtifactRow>,
    chats: Vec<ChatRow>,
    messages: Vec<MessageRow>,
    suggestions: Vec<SuggestionRow>,
}

/// Process-local [`WorldStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    faults: Mutex<HashSet<EntityKind>>,
    round_trips: AtomicU64,
}

impl MemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next write (insert or delete) to `kind` fail
    pub fn inject_fault(&self, kind: EntityKind) {
        self.faults.lock().insert(kind);
    }

    /// Number of store calls issued so far
    #[inline]
    #[must_use]
    pub fn round_trips(&self) -> u64 {
        self.round_trips.load(Ordering::Relaxed)
    }

    /// Rows across all tables and worlds
    #[must_use]
    pub fn total_rows(&self) -> usize {
        let t = self.tables.read();
        t.users.len() + t.artifacts.len() + t.chats.len() + t.messages.len() + t.suggestions.len()
    }

    fn take_fault(&self, kind: EntityKind) -> Result<(), StoreError> {
        if self.faults.lock().remove(&kind) {
            Err(StoreError::Backend(format!("injected fault on {kind} table")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl WorldStore for MemoryStore {
    async fn bulk_insert(&self, batch: RowBatch) -> Result<Vec<String>, StoreError> {
        self.round_trips.fetch_add(1, Ordering::Relaxed);
        self.take_fault(batch.kind())?;

        let mut t = self.tables.write();
        let ids = batch.ids();
        match batch {
            RowBatch::Users(rows) => {
                check_new_ids(&t.users, &rows)?;
                t.users.extend(rows);
            }
            RowBatch::Artifacts(rows) => {
                check_new_ids(&t.artifacts, &rows)?;
                let users = id_set(&t.users);
                check_references(&rows, EntityKind::User, &users, |r| &r.owner_id)?;
                t.artifacts.extend(rows);
            }
            RowBatch::Chats(rows) => {
                check_new_ids(&t.chats, &rows)?;
                let users = id_set(&t.users);
                check_references(&rows, EntityKind::User, &users, |r| &r.owner_id)?;
                t.chats.extend(rows);
            }
            RowBatch::Messages(rows) => {
                check_new_ids(&t.messages, &rows)?;
                let chats = id_set(&t.chats);
                check_references(&rows, EntityKind::Chat, &chats, |r| &r.chat_id)?;
                t.messages.extend(rows);
            }
            RowBatch::Suggestions(rows) => {
                check_new_ids(&t.suggestions, &rows)?;
                let artifacts = id_set(&t.artifacts);
                check_references(&rows, EntityKind::Artifact, &artifacts, |r| &r.artifact_id)?;
                t.suggestions.extend(rows);
            }
        }
        Ok(ids)
    }

    async fn bulk_delete(&self, kind: EntityKind, filter: &WorldFilter) -> Result<u64, StoreError> {
        self.round_trips.fetch_add(1, Ordering::Relaxed);
        self.take_fault(kind)?;

        let mut t = self.tables.write();
        let t = &mut *t;
        let deleted = match kind {
            EntityKind::User => {
                let doomed = matching_ids(&t.users, filter);
                restrict(&t.artifacts, EntityKind::User, &doomed, |r| &r.owner_id)?;
                restrict(&t.chats, EntityKind::User, &doomed, |r| &r.owner_id)?;
                remove_matching(&mut t.users, filter)
            }
            EntityKind::Artifact => {
                let doomed = matching_ids(&t.artifacts, filter);
                restrict(&t.suggestions, EntityKind::Artifact, &doomed, |r| &r.artifact_id)?;
                remove_matching(&mut t.artifacts, filter)
            }
            EntityKind::Chat => {
                let doomed = matching_ids(&t.chats, filter);
                restrict(&t.messages, EntityKind::Chat, &doomed, |r| &r.chat_id)?;
                remove_matching(&mut t.chats, filter)
            }
            EntityKind::Message => remove_matching(&mut t.messages, filter),
            EntityKind::Suggestion => remove_matching(&mut t.suggestions, filter),
        };
        Ok(deleted)
    }

    async fn select(&self, kind: EntityKind, filter: &WorldFilter) -> Result<RowBatch, StoreError> {
        self.round_trips.fetch_add(1, Ordering::Relaxed);
        let t = self.tables.read();
        Ok(match kind {
            EntityKind::User => select_matching(&t.users, filter),
            EntityKind::Artifact => select_matching(&t.artifacts, filter),
            EntityKind::Chat => select_matching(&t.chats, filter),
            EntityKind::Message => select_matching(&t.messages, filter),
            EntityKind::Suggestion => select_matching(&t.suggestions, filter),
        })
    }
}

fn id_set<R: WorldScoped>(rows: &[R]) -> HashSet<&str> {
    rows.iter().map(WorldScoped::id).collect()
}

fn matching_ids(rows: &[impl WorldScoped], filter: &WorldFilter) -> HashSet<String> {
    rows.iter()
        .filter(|r| filter.matches(r.world_id()))
        .map(|r| r.id().to_string())
        .collect()
}

fn check_new_ids<R: Row>(existing: &[R], new: &[R]) -> Result<(), StoreError> {
    let mut seen = id_set(existing);
    for row in new {
        if !seen.insert(row.id()) {
            return Err(StoreError::DuplicateKey {
                kind: R::KIND,
                id: row.id().to_string(),
            });
        }
    }
    Ok(())
}

fn check_references<R, F>(
    rows: &[R],
    references: EntityKind,
    targets: &HashSet<&str>,
    key: F,
) -> Result<(), StoreError>
where
    R: Row,
    F: Fn(&R) -> &String,
{
    match rows.iter().find(|r| !targets.contains(key(r).as_str())) {
        Some(row) => Err(StoreError::ForeignKeyViolation {
            kind: R::KIND,
            id: row.id().to_string(),
            references,
            target: key(row).clone(),
        }),
        None => Ok(()),
    }
}

fn restrict<R, F>(
    dependents: &[R],
    references: EntityKind,
    doomed: &HashSet<String>,
    key: F,
) -> Result<(), StoreError>
where
    R: Row,
    F: Fn(&R) -> &String,
{
    match dependents.iter().find(|r| doomed.contains(key(r))) {
        Some(row) => Err(StoreError::ForeignKeyViolation {
            kind: R::KIND,
            id: row.id().to_string(),
            references,
            target: key(row).clone(),
        }),
        None => Ok(()),
    }
}

fn remove_matching<R: WorldScoped>(rows: &mut Vec<R>, filter: &WorldFilter) -> u64 {
    let before = rows.len();
    rows.retain(|r| !filter.matches(r.world_id()));
    (before - rows.len()) as u64
}

fn select_matching<R: Row>(rows: &[R], filter: &WorldFilter) -> RowBatch {
    R::into_batch(
        rows.iter()
            .filter(|r| filter.matches(r.world_id()))
            .cloned()
            .collect(),
    )
}
