//! Collection handles bound to a storage driver.
//!
//! - [`Collection`] - untyped handle working with `bson::Document` payloads and [`Record`]s
//! - [`TypedCollection`] - handle converting to and from a [`Model`]
//!
//! # Example
//!
//! ```ignore
//! let restaurants = store.typed_collection::<Restaurant>();
//! let saved = restaurants.save(&Restaurant { id: None, name: "R1".into() }).await?;
//!
//! let reviews = store.collection(&format!("restaurants/{}/reviews", saved.id.unwrap()));
//! reviews.save(doc! { "stars": 5 }).await?;
//! ```

use std::marker::PhantomData;

use bson::Document;

use crate::{
    backend::{SaveOptions, StorageDriver},
    document::{Model, ModelExt},
    error::DocumentStoreResult,
    query::Query,
    record::Record,
};

/// An untyped collection with a reference to a storage driver.
#[derive(Debug)]
pub struct Collection<'a, B: StorageDriver> {
    path: String,
    backend: &'a B,
}

impl<'a, B: StorageDriver> Collection<'a, B> {
    pub(crate) fn new(path: String, backend: &'a B) -> Self {
        Self { path, backend }
    }

    /// Returns the full path of this collection.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn find_by_id(&self, id: &str) -> DocumentStoreResult<Option<Record>> {
        self.backend.find_by_id(&self.path, id).await
    }

    pub async fn find(&self, query: impl Into<Query>) -> DocumentStoreResult<Option<Record>> {
        self.backend.find(&self.path, query.into()).await
    }

    pub async fn query(&self, query: impl Into<Query>) -> DocumentStoreResult<Vec<Record>> {
        self.backend.query(&self.path, query.into()).await
    }

    /// Merge write with default options.
    pub async fn save(&self, data: Document) -> DocumentStoreResult<Record> {
        self.save_with(data, SaveOptions::default()).await
    }

    pub async fn save_with(
        &self,
        data: Document,
        options: SaveOptions,
    ) -> DocumentStoreResult<Record> {
        self.backend.save(&self.path, data, options).await
    }

    pub async fn update(&self, data: Document) -> DocumentStoreResult<Record> {
        self.backend.update(&self.path, data).await
    }

    pub async fn batch_get(&self, ids: Vec<String>) -> DocumentStoreResult<Vec<Option<Record>>> {
        self.backend.batch_get(&self.path, ids).await
    }

    pub async fn delete(&self, id: &str) -> DocumentStoreResult<()> {
        self.backend.delete(&self.path, id).await
    }

    /// Deletes every document in this collection, recursively.
    pub async fn clear(&self) -> DocumentStoreResult<()> {
        self.backend.clear(&self.path).await
    }
}

/// A collection handle that converts records to and from a [`Model`].
#[derive(Debug)]
pub struct TypedCollection<'a, B: StorageDriver, M: Model> {
    inner: Collection<'a, B>,
    _marker: PhantomData<M>,
}

impl<'a, B: StorageDriver, M: Model> TypedCollection<'a, B, M> {
    pub(crate) fn new(path: String, backend: &'a B) -> Self {
        Self {
            inner: Collection::new(path, backend),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &str {
        self.inner.path()
    }

    pub async fn find_by_id(&self, id: &str) -> DocumentStoreResult<Option<M>> {
        self.inner
            .find_by_id(id)
            .await?
            .as_ref()
            .map(M::from_record)
            .transpose()
    }

    pub async fn find(&self, query: impl Into<Query>) -> DocumentStoreResult<Option<M>> {
        self.inner
            .find(query)
            .await?
            .as_ref()
            .map(M::from_record)
            .transpose()
    }

    pub async fn query(&self, query: impl Into<Query>) -> DocumentStoreResult<Vec<M>> {
        self.inner
            .query(query)
            .await?
            .iter()
            .map(M::from_record)
            .collect()
    }

    /// Merge write; returns the model as stored, with id and timestamps.
    pub async fn save(&self, model: &M) -> DocumentStoreResult<M> {
        self.save_with(model, SaveOptions::default()).await
    }

    pub async fn save_with(&self, model: &M, options: SaveOptions) -> DocumentStoreResult<M> {
        let record = self.inner.save_with(model.to_document()?, options).await?;
        M::from_record(&record)
    }

    pub async fn update(&self, model: &M) -> DocumentStoreResult<M> {
        let record = self.inner.update(model.to_document()?).await?;
        M::from_record(&record)
    }

    pub async fn batch_get(&self, ids: Vec<String>) -> DocumentStoreResult<Vec<Option<M>>> {
        self.inner
            .batch_get(ids)
            .await?
            .iter()
            .map(|record| record.as_ref().map(M::from_record).transpose())
            .collect()
    }

    pub async fn delete(&self, id: &str) -> DocumentStoreResult<()> {
        self.inner.delete(id).await
    }

    pub async fn clear(&self) -> DocumentStoreResult<()> {
        self.inner.clear().await
    }
}
