//! In-memory hierarchical document storage driver for treelayer.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! `StorageDriver` trait. Documents live in a tree of collection and document
//! nodes behind an async-aware read-write lock. It is meant for tests and
//! local development against code written for a hierarchical document
//! database.
//!
//! # Features
//!
//! - **Nested collections** - Any document can hold sub-collections, addressed by slash-delimited paths
//! - **Merge and overwrite writes** - Deep merge with atomic arrays, or whole-document replacement
//! - **Queries and group queries** - Filtering, ordering and pagination, across one collection or every collection with a given name
//! - **Transactions** - Read-then-write discipline enforced at runtime
//! - **Export/import** - JSON-safe snapshots of the whole tree or a subtree
//!
//! # Quick Start
//!
//! ```ignore
//! use treelayer::{prelude::*, memory::InMemoryStorage};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryStorage::new());
//!
//!     let restaurant = store.collection("restaurants").save(doc! { "name": "R1" }).await?;
//!     store
//!         .collection(&format!("restaurants/{}/comments", restaurant.id))
//!         .save(doc! { "text": "great" })
//!         .await?;
//!
//!     let snapshot = store.export(None).await?;
//!     println!("{}", snapshot.to_json_string()?);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as treelayer_memory;

mod evaluator;
mod serializer;
mod tree;
mod write;

pub mod store;
pub mod transaction;

pub use store::{Clock, InMemoryStorage, InMemoryStorageBuilder};
pub use transaction::MemoryTransaction;
