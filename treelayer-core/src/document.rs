//! Typed models stored through a driver.
//!
//! A [`Model`] is any serde type with a home collection. Its serialized form
//! is the write payload: an `id` field selects the target document, and the
//! `createdAt`/`updatedAt` fields are filled in from the record on the way
//! back.

use bson::{Bson, Document, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    record::Record,
};

/// Core trait for typed documents.
///
/// # Example
///
/// ```ignore
/// use treelayer::document::Model;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Restaurant {
///     #[serde(skip_serializing_if = "Option::is_none")]
///     pub id: Option<String>,
///     pub name: String,
/// }
///
/// impl Model for Restaurant {
///     fn collection_name() -> &'static str {
///         "restaurants"
///     }
/// }
/// ```
pub trait Model: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name of the top-level collection this model lives in.
    fn collection_name() -> &'static str;
}

/// Conversion helpers, implemented for every [`Model`].
pub trait ModelExt: Model {
    /// Serializes the model into a write payload.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the model does not
    /// serialize to a document.
    fn to_document(&self) -> DocumentStoreResult<Document>;

    /// Deserializes the model from the flattened record view.
    fn from_record(record: &Record) -> DocumentStoreResult<Self>;
}

impl<M: Model> ModelExt for M {
    fn to_document(&self) -> DocumentStoreResult<Document> {
        match serialize_to_bson(self)? {
            Bson::Document(doc) => Ok(doc),
            other => Err(DocumentStoreError::InvalidDocument(format!(
                "model {} serialized to {:?}, expected a document",
                std::any::type_name::<M>(),
                other.element_type()
            ))),
        }
    }

    fn from_record(record: &Record) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_bson(Bson::Document(record.to_document()))?)
    }
}
