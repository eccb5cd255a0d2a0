//! Convenient re-exports of commonly used types from treelayer.
//!
//! ```ignore
//! use treelayer::prelude::*;
//! ```
//!
//! This provides access to:
//! - Model traits
//! - Storage driver traits and builders
//! - Query construction
//! - Collection handles and the document store
//! - Records, snapshots and error types

pub use treelayer_core::{
    backend::{SaveOptions, StorageDriver, StorageDriverBuilder, StorageTransaction, TransactionOptions},
    collection::{Collection, TypedCollection},
    document::{Model, ModelExt},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Operator, Predicate, Query, QueryBuilder, Sort, SortDirection},
    record::Record,
    snapshot::TreeSnapshot,
    store::DocumentStore,
};
