//! Backing-store contract
//!
//! The subsystem needs only bulk insert, bulk delete and select, each
//! filtered by equality on the nullable world tag. Real database clients
//! implement [`WorldStore`]; [`crate::MemoryStore`] is the in-process
//! implementation used by tests.

use crate::context::WorldFilter;
use crate::error::StoreError;
use crate::rows::RowBatch;
use async_trait::async_trait;
use testworld_core::EntityKind;

/// Bulk operations over world-tagged tables
#[async_trait]
pub trait WorldStore: Send + Sync {
    /// Insert all rows of one table in a single round trip
    ///
    /// Returns the inserted primary keys in batch order. The write is
    /// all-or-nothing: on error no row of the batch is persisted.
    async fn bulk_insert(&self, batch: RowBatch) -> Result<Vec<String>, StoreError>;

    /// Delete every row of `kind` matching `filter`, returning the count
    async fn bulk_delete(&self, kind: EntityKind, filter: &WorldFilter) -> Result<u64, StoreError>;

    /// Select every row of `kind` matching `filter`
    async fn select(&self, kind: EntityKind, filter: &WorldFilter) -> Result<RowBatch, StoreError>;

    /// Count rows of `kind` matching `filter`
    async fn count(&self, kind: EntityKind, filter: &WorldFilter) -> Result<u64, StoreError> {
        Ok(self.select(kind, filter).await?.len() as u64)
    }
}
