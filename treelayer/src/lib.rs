//! Main treelayer crate providing a uniform interface over hierarchical document databases.
//!
//! This crate is the primary entry point. It re-exports the core types from
//! `treelayer-core` and the in-memory driver from `treelayer-memory`.
//!
//! # Features
//!
//! - **Hierarchical paths** - Collections of documents, documents with sub-collections, to any depth
//! - **Swappable drivers** - Code written against [`backend::StorageDriver`] runs on any driver
//! - **Queries** - Field predicates, ordering, offset and limit, per collection or across a collection group
//! - **Typed models** - Serde structs as documents through [`document::Model`]
//!
//! # Quick Start
//!
//! ```ignore
//! use treelayer::{prelude::*, memory::InMemoryStorage};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct Restaurant {
//!     #[serde(skip_serializing_if = "Option::is_none")]
//!     pub id: Option<String>,
//!     pub name: String,
//!     pub rating: i64,
//! }
//!
//! impl Model for Restaurant {
//!     fn collection_name() -> &'static str { "restaurants" }
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryStorage::builder().build().await?);
//!     let restaurants = store.typed_collection::<Restaurant>();
//!
//!     let saved = restaurants
//!         .save(&Restaurant { id: None, name: "R1".into(), rating: 4 })
//!         .await?;
//!
//!     let good = restaurants
//!         .query(Query::builder().filter("rating", Operator::Gte, 4).build())
//!         .await?;
//!     assert_eq!(good.len(), 1);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Transactions
//!
//! All reads of a transaction must happen before its first write:
//!
//! ```ignore
//! use treelayer::{prelude::*, bson::doc};
//!
//! store
//!     .transaction(|mut tx| async move {
//!         let current = tx.get("counters", "visits").await?;
//!         let next = current.and_then(|r| r.data.get_i64("n").ok()).unwrap_or(0) + 1;
//!         tx.set("counters", doc! { "id": "visits", "n": next }).await
//!     })
//!     .await?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing

pub mod prelude;

pub use treelayer_core::{
    backend, collection, document, error, path, query, record, snapshot, store, value,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage driver.
pub mod memory {
    pub use treelayer_memory::{Clock, InMemoryStorage, InMemoryStorageBuilder, MemoryTransaction};
}
