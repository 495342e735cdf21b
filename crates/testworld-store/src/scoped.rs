//! Context-bound store handle
//!
//! [`ScopedStore`] is what request handlers hold: every read is filtered by
//! the request's world and every write is tagged with it. Reads re-check
//! each returned row against [`can_access`], so a backend that drops the
//! filter fails loudly instead of leaking another world's data.

use crate::context::{can_access, filter_for, tag, WorldContext};
use crate::error::StoreError;
use crate::rows::Row;
use crate::store::WorldStore;
use std::sync::Arc;
use testworld_core::EntityKind;

/// World-scoped view of a [`WorldStore`]
#[derive(Clone)]
pub struct ScopedStore {
    store: Arc<dyn WorldStore>,
    context: WorldContext,
}

impl std::fmt::Debug for ScopedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedStore")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl ScopedStore {
    /// Bind `store` to `context`
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn WorldStore>, context: WorldContext) -> Self {
        Self { store, context }
    }

    /// Context every operation is scoped to
    #[inline]
    #[must_use]
    pub fn context(&self) -> &WorldContext {
        &self.context
    }

    /// All rows of `R` visible in this world
    pub async fn select<R: Row>(&self) -> Result<Vec<R>, StoreError> {
        let batch = self.store.select(R::KIND, &filter_for(&self.context)).await?;
        let actual = batch.kind();
        let rows = R::from_batch(batch).ok_or(StoreError::BatchMismatch {
            expected: R::KIND,
            actual,
        })?;

        if let Some(leaked) = rows.iter().find(|r| !can_access(r.world_id(), &self.context)) {
            tracing::error!(
                kind = %R::KIND,
                row_id = leaked.id(),
                "store returned a row outside the request world"
            );
            return Err(StoreError::IsolationViolation {
                kind: R::KIND,
                row_id: leaked.id().to_string(),
                row_world: leaked.world_id().cloned(),
                context_world: self.context.world_id().cloned(),
            });
        }
        Ok(rows)
    }

    /// Row of `R` with primary key `id`, if visible in this world
    pub async fn find<R: Row>(&self, id: &str) -> Result<Option<R>, StoreError> {
        Ok(self.select::<R>().await?.into_iter().find(|r| r.id() == id))
    }

    /// Tag rows with this world and insert them in one batch
    pub async fn insert<R: Row>(&self, rows: Vec<R>) -> Result<Vec<String>, StoreError> {
        let rows = rows.into_iter().map(|r| tag(r, &self.context)).collect();
        self.store.bulk_insert(R::into_batch(rows)).await
    }

    /// Delete every row of `kind` in this world
    pub async fn delete_all(&self, kind: EntityKind) -> Result<u64, StoreError> {
        self.store.bulk_delete(kind, &filter_for(&self.context)).await
    }
}
