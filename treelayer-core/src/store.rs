//! Main document store interface.
//!
//! [`DocumentStore`] wraps a [`StorageDriver`] and hands out collection
//! handles. It adds no behavior of its own; swapping the driver swaps the
//! backend.
//!
//! # Example
//!
//! ```ignore
//! use treelayer::{prelude::*, memory::InMemoryStorage};
//!
//! let store = DocumentStore::new(InMemoryStorage::new());
//! let restaurants = store.typed_collection::<Restaurant>();
//! let reviews = store.collection("restaurants/r1/reviews");
//! ```

use std::future::Future;

use crate::{
    backend::{StorageDriver, TransactionOptions},
    collection::{Collection, TypedCollection},
    document::Model,
    error::DocumentStoreResult,
    query::Query,
    record::Record,
    snapshot::TreeSnapshot,
};

/// A document store bound to a specific driver implementation.
#[derive(Debug, Clone)]
pub struct DocumentStore<B: StorageDriver> {
    backend: B,
}

impl<B: StorageDriver> DocumentStore<B> {
    /// Creates a new document store with the given driver.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the underlying driver.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Gets an untyped collection handle for a collection path.
    pub fn collection(&self, path: &str) -> Collection<'_, B> {
        Collection::new(path.to_string(), &self.backend)
    }

    /// Gets a typed collection handle at the model's top-level collection.
    pub fn typed_collection<M: Model>(&self) -> TypedCollection<'_, B, M> {
        TypedCollection::new(M::collection_name().to_string(), &self.backend)
    }

    /// Gets a typed collection handle at an explicit (possibly nested) path.
    pub fn typed_collection_at<M: Model>(&self, path: &str) -> TypedCollection<'_, B, M> {
        TypedCollection::new(path.to_string(), &self.backend)
    }

    /// Queries every collection named `collection_id`, at any depth.
    pub async fn group_query(
        &self,
        collection_id: &str,
        query: impl Into<Query>,
    ) -> DocumentStoreResult<Vec<Record>> {
        self.backend.group_query(collection_id, query.into()).await
    }

    /// Runs `update_fn` inside a driver transaction.
    pub async fn transaction<F, Fut, R>(&self, update_fn: F) -> DocumentStoreResult<R>
    where
        F: FnOnce(B::Transaction) -> Fut + Send,
        Fut: Future<Output = DocumentStoreResult<R>> + Send,
        R: Send,
    {
        self.backend
            .transaction(update_fn, TransactionOptions::default())
            .await
    }

    pub fn generate_id(&self) -> String {
        self.backend.generate_id()
    }

    /// Exports the whole tree, or the subtree at a document path.
    pub async fn export(&self, root: Option<&str>) -> DocumentStoreResult<TreeSnapshot> {
        self.backend.export(root).await
    }

    /// Replaces the whole tree with a snapshot.
    pub async fn import(&self, snapshot: TreeSnapshot) -> DocumentStoreResult<()> {
        self.backend.import(snapshot).await
    }
}
