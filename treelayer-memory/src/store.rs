//! In-memory storage driver.
//!
//! The whole store is one [`DocumentNode`] tree behind an async-aware
//! read-write lock. Every operation takes the lock once, does its work
//! synchronously and releases it, so each call observes a consistent tree.

use std::{fmt, future::Future, sync::Arc};

use async_trait::async_trait;
use bson::Document;
use chrono::{DateTime, Utc};
use mea::rwlock::RwLock;

use treelayer_core::{
    backend::{SaveOptions, StorageDriver, StorageDriverBuilder, TransactionOptions},
    error::{DocumentStoreError, DocumentStoreResult},
    path::{CollectionPath, DocumentPath},
    query::Query,
    record::Record,
    snapshot::TreeSnapshot,
};

use crate::{
    evaluator::run_query,
    transaction::MemoryTransaction,
    tree::{DocumentNode, walk_collections},
    write::{Precondition, WriteMode, apply_write, prepare_payload},
};

/// Time source used for `createdAt`/`updatedAt`.
///
/// Defaults to the system clock. Tests inject a fixed or stepping clock with
/// [`Clock::new`].
#[derive(Clone)]
pub struct Clock(Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>);

impl Clock {
    pub fn new(now: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        Self(Arc::new(now))
    }

    /// The wall clock.
    pub fn system() -> Self {
        Self::new(Utc::now)
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.0)()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Clock").finish_non_exhaustive()
    }
}

/// Thread-safe in-memory hierarchical document store.
///
/// This struct implements the [`StorageDriver`] trait on top of a tree of
/// document and collection nodes.
///
/// # Thread Safety
///
/// `InMemoryStorage` is cloneable and uses an `Arc`-wrapped tree, so it can
/// be shared across async tasks. Clones share the same underlying data;
/// separate calls to [`InMemoryStorage::new`] give independent stores.
///
/// # Performance
///
/// Queries scan every document of the target collections (no indexing).
/// Group queries walk the whole tree.
///
/// # Example
///
/// ```ignore
/// use treelayer_memory::InMemoryStorage;
/// use treelayer::backend::{SaveOptions, StorageDriver};
/// use bson::doc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let storage = InMemoryStorage::new();
///
///     let saved = storage
///         .save("restaurants", doc! { "name": "R1" }, SaveOptions::default())
///         .await?;
///     let found = storage.find_by_id("restaurants", &saved.id).await?;
///     assert_eq!(found, Some(saved));
///
///     Ok(())
/// }
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStorage {
    root: Arc<RwLock<DocumentNode>>,
    clock: Clock,
}

impl InMemoryStorage {
    /// Creates a new empty store using the system clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for a store with a custom clock or seeded contents.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use treelayer_memory::InMemoryStorage;
    /// use treelayer::backend::StorageDriverBuilder;
    ///
    /// let storage = InMemoryStorage::builder()
    ///     .with_snapshot(snapshot)
    ///     .build()
    ///     .await?;
    /// ```
    pub fn builder() -> InMemoryStorageBuilder {
        InMemoryStorageBuilder::default()
    }

    fn from_clock(clock: Clock) -> Self {
        Self {
            root: Arc::new(RwLock::new(DocumentNode::default())),
            clock,
        }
    }

    pub(crate) async fn read_record(&self, path: &str, id: &str) -> DocumentStoreResult<Option<Record>> {
        let doc_path = CollectionPath::parse(path)?.document(id)?;
        let root = self.root.read().await;

        Ok(root
            .document(&doc_path)
            .and_then(|node| node.to_record(id, doc_path.to_string())))
    }

    pub(crate) async fn collection_query(&self, path: &str, query: &Query) -> DocumentStoreResult<Vec<Record>> {
        let collection_path = CollectionPath::parse(path)?;
        query.validate()?;

        let records = {
            let root = self.root.read().await;
            root.collection(&collection_path)
                .map(|collection| collection.records(&collection_path.to_string()))
                .unwrap_or_default()
        };

        run_query(records, query)
    }

    /// Validates and applies a write, returning the stored record.
    ///
    /// Everything that can fail is checked before the tree is touched.
    pub(crate) async fn write(
        &self,
        path: &str,
        data: Document,
        mode: WriteMode,
        precondition: Precondition,
    ) -> DocumentStoreResult<Record> {
        let collection_path = CollectionPath::parse(path)?;
        let payload = prepare_payload(data)?;

        let id = match (payload.id, precondition) {
            (Some(id), _) => id,
            (None, Precondition::Exists) => {
                return Err(DocumentStoreError::InvalidDocument(format!(
                    "update in {collection_path} requires an id"
                )));
            }
            (None, _) => self.generate_id(),
        };
        let doc_path = collection_path.document(&id)?;

        let mut root = self.root.write().await;

        let exists = root
            .document(&doc_path)
            .is_some_and(|node| node.data.is_some());
        match precondition {
            Precondition::Exists if !exists => {
                return Err(DocumentStoreError::DocumentNotFound(id, collection_path.to_string()));
            }
            Precondition::Absent if exists => {
                return Err(DocumentStoreError::DocumentAlreadyExists(
                    id,
                    collection_path.to_string(),
                ));
            }
            _ => {}
        }

        let node = root.document_mut(&doc_path);
        apply_write(node, payload.data, mode, self.clock.now());

        node.to_record(&id, doc_path.to_string()).ok_or_else(|| {
            DocumentStoreError::Backend(format!("document {doc_path} holds no data after write"))
        })
    }

    pub(crate) async fn remove(&self, path: &str, id: &str) -> DocumentStoreResult<()> {
        let collection_path = CollectionPath::parse(path)?;
        collection_path.document(id)?;

        let mut root = self.root.write().await;
        if let Some(collection) = root.collection_existing_mut(&collection_path) {
            collection.documents.remove(id);
        }

        Ok(())
    }
}

#[async_trait]
impl StorageDriver for InMemoryStorage {
    type Transaction = MemoryTransaction;

    async fn find_by_id(&self, path: &str, id: &str) -> DocumentStoreResult<Option<Record>> {
        let record = self.read_record(path, id).await?;
        tracing::debug!(path, id, found = record.is_some(), "find_by_id");

        Ok(record)
    }

    async fn find(&self, path: &str, query: Query) -> DocumentStoreResult<Option<Record>> {
        let query = Query { limit: Some(1), ..query };
        let record = self.collection_query(path, &query).await?.into_iter().next();
        tracing::debug!(path, found = record.is_some(), "find");

        Ok(record)
    }

    async fn query(&self, path: &str, query: Query) -> DocumentStoreResult<Vec<Record>> {
        let records = self.collection_query(path, &query).await?;
        tracing::debug!(path, returned = records.len(), "query");

        Ok(records)
    }

    async fn group_query(
        &self,
        collection_id: &str,
        query: Query,
    ) -> DocumentStoreResult<Vec<Record>> {
        query.validate()?;

        let records = {
            let root = self.root.read().await;
            let mut records = Vec::new();

            walk_collections(&root, "", &mut |name, collection_path, collection| {
                if name == collection_id {
                    records.extend(collection.records(collection_path));
                }
            });

            records
        };

        let records = run_query(records, &query)?;
        tracing::debug!(collection_id, returned = records.len(), "group_query");

        Ok(records)
    }

    async fn save(
        &self,
        path: &str,
        data: Document,
        options: SaveOptions,
    ) -> DocumentStoreResult<Record> {
        let record = self
            .write(path, data, options.into(), Precondition::None)
            .await?;
        tracing::debug!(path, id = %record.id, avoid_merge = options.avoid_merge, "save");

        Ok(record)
    }

    async fn update(&self, path: &str, data: Document) -> DocumentStoreResult<Record> {
        let record = self
            .write(path, data, WriteMode::Merge, Precondition::Exists)
            .await?;
        tracing::debug!(path, id = %record.id, "update");

        Ok(record)
    }

    async fn batch_get(
        &self,
        path: &str,
        ids: Vec<String>,
    ) -> DocumentStoreResult<Vec<Option<Record>>> {
        let collection_path = CollectionPath::parse(path)?;
        let doc_paths = ids
            .iter()
            .map(|id| collection_path.document(id))
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        let records = {
            let root = self.root.read().await;
            ids.iter()
                .zip(doc_paths)
                .map(|(id, doc_path)| {
                    root.document(&doc_path)
                        .and_then(|node| node.to_record(id, doc_path.to_string()))
                })
                .collect::<Vec<_>>()
        };

        tracing::debug!(
            path,
            requested = ids.len(),
            found = records.iter().flatten().count(),
            "batch_get"
        );

        Ok(records)
    }

    async fn delete(&self, path: &str, id: &str) -> DocumentStoreResult<()> {
        self.remove(path, id).await?;
        tracing::debug!(path, id, "delete");

        Ok(())
    }

    async fn clear(&self, path: &str) -> DocumentStoreResult<()> {
        if path.trim_matches('/').is_empty() {
            *self.root.write().await = DocumentNode::default();
            tracing::debug!("cleared store");
            return Ok(());
        }

        let collection_path = CollectionPath::parse(path)?;
        let mut root = self.root.write().await;
        if let Some(collection) = root.collection_existing_mut(&collection_path) {
            collection.documents.clear();
        }
        tracing::debug!(path, "clear");

        Ok(())
    }

    async fn transaction<F, Fut, R>(
        &self,
        update_fn: F,
        options: TransactionOptions,
    ) -> DocumentStoreResult<R>
    where
        Self: Sized,
        F: FnOnce(Self::Transaction) -> Fut + Send,
        Fut: Future<Output = DocumentStoreResult<R>> + Send,
        R: Send,
    {
        if let Some(max_attempts) = options.max_attempts {
            tracing::debug!(max_attempts, "in-memory transactions run once, ignoring max_attempts");
        }
        tracing::debug!("starting transaction");

        update_fn(MemoryTransaction::new(self.clone())).await
    }

    fn generate_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    async fn export(&self, root: Option<&str>) -> DocumentStoreResult<TreeSnapshot> {
        let doc_path = match root {
            Some(path) if !path.trim_matches('/').is_empty() => DocumentPath::parse(path)?,
            _ => DocumentPath::root(),
        };

        let snapshot = match self.root.read().await.document(&doc_path) {
            Some(node) => node.to_snapshot()?,
            None => TreeSnapshot::default(),
        };
        tracing::debug!(root = %doc_path, nodes = snapshot.node_count(), "export");

        Ok(snapshot)
    }

    async fn import(&self, snapshot: TreeSnapshot) -> DocumentStoreResult<()> {
        let nodes = snapshot.node_count();
        let tree = DocumentNode::from_snapshot(snapshot, self.clock.now())?;

        *self.root.write().await = tree;
        tracing::debug!(nodes, "import");

        Ok(())
    }
}

/// Builder for constructing [`InMemoryStorage`] instances.
///
/// # Example
///
/// ```ignore
/// use treelayer_memory::{Clock, InMemoryStorage};
/// use treelayer::backend::StorageDriverBuilder;
///
/// let storage = InMemoryStorage::builder()
///     .with_clock(Clock::new(|| fixed_instant))
///     .build()
///     .await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStorageBuilder {
    snapshot: Option<TreeSnapshot>,
    clock: Option<Clock>,
}

impl InMemoryStorageBuilder {
    /// Seeds the store with the contents of a snapshot.
    pub fn with_snapshot(mut self, snapshot: TreeSnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Uses `clock` for `createdAt`/`updatedAt` instead of the system clock.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }
}

#[async_trait]
impl StorageDriverBuilder for InMemoryStorageBuilder {
    type Driver = InMemoryStorage;

    /// Builds the store, importing the seed snapshot if one was given.
    async fn build(self) -> DocumentStoreResult<Self::Driver> {
        let storage = InMemoryStorage::from_clock(self.clock.unwrap_or_default());

        if let Some(snapshot) = self.snapshot {
            storage.import(snapshot).await?;
        }

        Ok(storage)
    }
}
