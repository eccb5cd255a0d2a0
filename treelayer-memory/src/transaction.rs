//! Read-then-write transactions over the in-memory tree.
//!
//! A transaction is a sequencing discipline: every read must come before the
//! first write. Writes apply to the shared tree immediately; there is no
//! isolation and no rollback.

use async_trait::async_trait;
use bson::Document;

use treelayer_core::{
    backend::StorageTransaction,
    error::{DocumentStoreError, DocumentStoreResult},
    query::Query,
    record::Record,
};

use crate::{
    store::InMemoryStorage,
    write::{Precondition, WriteMode},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Read,
    Write,
}

/// Transaction handle passed to [`StorageDriver::transaction`] callbacks.
///
/// [`StorageDriver::transaction`]: treelayer_core::backend::StorageDriver::transaction
#[derive(Debug)]
pub struct MemoryTransaction {
    storage: InMemoryStorage,
    phase: Phase,
}

impl MemoryTransaction {
    pub(crate) fn new(storage: InMemoryStorage) -> Self {
        Self {
            storage,
            phase: Phase::Read,
        }
    }

    /// Whether a write has been issued on this transaction.
    pub fn has_written(&self) -> bool {
        self.phase == Phase::Write
    }

    fn ensure_read_phase(&self) -> DocumentStoreResult<()> {
        match self.phase {
            Phase::Read => Ok(()),
            Phase::Write => Err(DocumentStoreError::ReadAfterWrite),
        }
    }

    async fn write(
        &mut self,
        path: &str,
        data: Document,
        mode: WriteMode,
        precondition: Precondition,
    ) -> DocumentStoreResult<()> {
        self.phase = Phase::Write;
        let record = self.storage.write(path, data, mode, precondition).await?;
        tracing::trace!(path, id = %record.id, ?precondition, "transactional write");

        Ok(())
    }
}

#[async_trait]
impl StorageTransaction for MemoryTransaction {
    async fn get(&mut self, path: &str, id: &str) -> DocumentStoreResult<Option<Record>> {
        self.ensure_read_phase()?;
        self.storage.read_record(path, id).await
    }

    async fn query(&mut self, path: &str, query: Query) -> DocumentStoreResult<Vec<Record>> {
        self.ensure_read_phase()?;
        self.storage.collection_query(path, &query).await
    }

    async fn create(&mut self, path: &str, data: Document) -> DocumentStoreResult<()> {
        self.write(path, data, WriteMode::Merge, Precondition::Absent).await
    }

    async fn set(&mut self, path: &str, data: Document) -> DocumentStoreResult<()> {
        self.write(path, data, WriteMode::Merge, Precondition::None).await
    }

    async fn set_avoid_merge(&mut self, path: &str, data: Document) -> DocumentStoreResult<()> {
        self.write(path, data, WriteMode::Overwrite, Precondition::None).await
    }

    async fn update(&mut self, path: &str, data: Document) -> DocumentStoreResult<()> {
        self.write(path, data, WriteMode::Merge, Precondition::Exists).await
    }

    async fn delete(&mut self, path: &str, id: &str) -> DocumentStoreResult<()> {
        self.phase = Phase::Write;
        self.storage.remove(path, id).await
    }
}
