//! Core vocabulary of treelayer: a uniform interface over hierarchical document databases.
//!
//! A hierarchical database holds collections of documents, and every document
//! may hold sub-collections of its own. This crate provides:
//!
//! - **Paths** ([`path`]) - Typed `collection/id/collection/id` addresses
//! - **Field values** ([`value`]) - Temporal recognition, truthiness and field-path lookup
//! - **Queries** ([`query`]) - Predicates, ordering and pagination
//! - **Records** ([`record`]) - Field data plus identity and timestamps, as returned to callers
//! - **Snapshots** ([`snapshot`]) - The JSON-safe tree export/import format
//! - **Driver abstraction** ([`backend`]) - Traits every storage driver implements
//! - **Typed access** ([`document`], [`collection`], [`store`]) - Models and collection handles
//! - **Error handling** ([`error`]) - The shared error enum and result type
//!
//! # Example
//!
//! ```ignore
//! use treelayer::{prelude::*, memory::InMemoryStorage};
//! use bson::doc;
//!
//! let store = DocumentStore::new(InMemoryStorage::new());
//! let saved = store.collection("restaurants").save(doc! { "name": "R1" }).await?;
//! assert_eq!(saved.created_at, saved.updated_at);
//! ```

#[allow(unused_extern_crates)]
extern crate self as treelayer_core;

pub mod backend;
pub mod collection;
pub mod document;
pub mod error;
pub mod path;
pub mod query;
pub mod record;
pub mod snapshot;
pub mod store;
pub mod value;
