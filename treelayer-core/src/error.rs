//! Error types and result types for document store operations.
//!
//! This module provides the single error enum shared by every driver.
//! Use [`DocumentStoreResult<T>`] as the return type for fallible operations.
//!
//! Ordinary misses are not errors: point reads return `None` and queries
//! return an empty list. The variants below cover invalid input, protocol
//! violations inside transactions and conversion failures.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between formats (BSON, JSON, snapshots).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// A document with the given ID already holds data at the given collection path.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// The requested document does not exist at the given collection path.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// The payload contains a value the store cannot represent, or a malformed id.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The hierarchical path is malformed or has the wrong number of segments.
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    /// The query uses an unknown operator or an operand of the wrong shape.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// A read was issued on a transaction that has already written.
    #[error("Transactions require all reads to be executed before all writes")]
    ReadAfterWrite,
    /// An error occurred in an underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
