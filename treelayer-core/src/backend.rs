//! Storage driver abstraction for hierarchical document stores.
//!
//! This module defines the traits that abstract over storage implementations,
//! so application code can swap a network-backed database for the in-memory
//! driver without changing behavior.
//!
//! # Overview
//!
//! The [`StorageDriver`] trait provides a unified async interface for point
//! reads, queries, group queries, writes, deletes, transactions and tree-wide
//! export/import. Every path argument is a slash-delimited hierarchical path
//! alternating collection names and document ids; collection arguments must
//! have an odd number of segments.
//!
//! # Traits
//!
//! - [`StorageDriver`]: The core trait for storage drivers
//! - [`StorageTransaction`]: Read-then-write transaction handle
//! - [`StorageDriverBuilder`]: Factory trait for creating driver instances
//!
//! # Examples
//!
//! ```ignore
//! use treelayer::backend::{SaveOptions, StorageDriver};
//! use bson::doc;
//!
//! let saved = driver
//!     .save("restaurants", doc! { "name": "R1" }, SaveOptions::default())
//!     .await?;
//! let same = driver.find_by_id("restaurants", &saved.id).await?;
//! assert_eq!(same, Some(saved));
//! ```

use std::{fmt::Debug, future::Future};

use async_trait::async_trait;
use bson::Document;
use serde::{Deserialize, Serialize};

use crate::{error::DocumentStoreResult, query::Query, record::Record, snapshot::TreeSnapshot};

/// Options for [`StorageDriver::save`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOptions {
    /// Replace the whole field data instead of deep-merging into it.
    #[serde(default)]
    pub avoid_merge: bool,
}

impl SaveOptions {
    /// Options for an overwrite write.
    pub fn overwrite() -> Self {
        Self { avoid_merge: true }
    }
}

/// Options for [`StorageDriver::transaction`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOptions {
    /// Upper bound on retries for drivers that retry on contention.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

/// Abstract interface for hierarchical document storage drivers.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` and usable from multiple async
/// tasks. The exact concurrency model is implementation-specific.
///
/// # Error Handling
///
/// Ordinary misses are not errors: point reads return `None` and queries
/// return empty lists. Malformed paths, invalid payloads and invalid queries
/// fail with the matching [`DocumentStoreError`](crate::error::DocumentStoreError)
/// variant before anything is mutated.
#[async_trait]
pub trait StorageDriver: Send + Sync + Debug {
    /// The transaction handle passed to [`StorageDriver::transaction`] callbacks.
    type Transaction: StorageTransaction + Send;

    /// Reads one document by id. Never creates nodes.
    async fn find_by_id(&self, path: &str, id: &str) -> DocumentStoreResult<Option<Record>>;

    /// Runs `query` limited to one result and returns the first match.
    async fn find(&self, path: &str, query: Query) -> DocumentStoreResult<Option<Record>>;

    /// Runs `query` against the documents of one collection.
    async fn query(&self, path: &str, query: Query) -> DocumentStoreResult<Vec<Record>>;

    /// Runs `query` against every collection named `collection_id`, at any depth.
    async fn group_query(
        &self,
        collection_id: &str,
        query: Query,
    ) -> DocumentStoreResult<Vec<Record>>;

    /// Writes a document, merging into existing data unless `options.avoid_merge` is set.
    ///
    /// An `id` field in `data` selects the target document, otherwise a fresh
    /// id is generated. Returns the stored record.
    async fn save(
        &self,
        path: &str,
        data: Document,
        options: SaveOptions,
    ) -> DocumentStoreResult<Record>;

    /// Merges `data` into an existing document named by its `id` field.
    ///
    /// Fails with `DocumentNotFound` rather than creating a document.
    async fn update(&self, path: &str, data: Document) -> DocumentStoreResult<Record>;

    /// Reads several documents, preserving input order with `None` for misses.
    async fn batch_get(
        &self,
        path: &str,
        ids: Vec<String>,
    ) -> DocumentStoreResult<Vec<Option<Record>>>;

    /// Deletes one document and everything below it. Missing ids are a no-op.
    async fn delete(&self, path: &str, id: &str) -> DocumentStoreResult<()>;

    /// Deletes every document of a collection, recursively.
    ///
    /// The empty path clears the whole store.
    async fn clear(&self, path: &str) -> DocumentStoreResult<()>;

    /// Runs `update_fn` once with a fresh transaction and returns its result.
    async fn transaction<F, Fut, R>(
        &self,
        update_fn: F,
        options: TransactionOptions,
    ) -> DocumentStoreResult<R>
    where
        Self: Sized,
        F: FnOnce(Self::Transaction) -> Fut + Send,
        Fut: Future<Output = DocumentStoreResult<R>> + Send,
        R: Send;

    /// Returns a fresh document id.
    fn generate_id(&self) -> String;

    /// Exports the whole tree, or the subtree at the document path `root`.
    async fn export(&self, root: Option<&str>) -> DocumentStoreResult<TreeSnapshot>;

    /// Replaces the whole tree with the contents of `snapshot`.
    async fn import(&self, snapshot: TreeSnapshot) -> DocumentStoreResult<()>;
}

/// A transaction handle that requires every read to happen before any write.
///
/// Reads issued after the first write fail with
/// [`DocumentStoreError::ReadAfterWrite`](crate::error::DocumentStoreError::ReadAfterWrite).
#[async_trait]
pub trait StorageTransaction {
    /// Reads one document by id.
    async fn get(&mut self, path: &str, id: &str) -> DocumentStoreResult<Option<Record>>;

    /// Runs a query against one collection.
    async fn query(&mut self, path: &str, query: Query) -> DocumentStoreResult<Vec<Record>>;

    /// Creates a document, failing if the given id already holds data.
    async fn create(&mut self, path: &str, data: Document) -> DocumentStoreResult<()>;

    /// Merge write, as [`StorageDriver::save`] with default options.
    async fn set(&mut self, path: &str, data: Document) -> DocumentStoreResult<()>;

    /// Overwrite write, as [`StorageDriver::save`] with `avoid_merge`.
    async fn set_avoid_merge(&mut self, path: &str, data: Document) -> DocumentStoreResult<()>;

    /// Merge write that requires an existing document.
    async fn update(&mut self, path: &str, data: Document) -> DocumentStoreResult<()>;

    /// Deletes one document.
    async fn delete(&mut self, path: &str, id: &str) -> DocumentStoreResult<()>;
}

#[async_trait]
pub trait StorageDriverBuilder {
    type Driver: StorageDriver;

    async fn build(self) -> DocumentStoreResult<Self::Driver>;
}
