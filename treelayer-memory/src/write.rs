//! Write semantics: payload validation, merge and overwrite.
//!
//! Field data is limited to null, booleans, numbers, strings, dates, arrays
//! and nested documents. A payload is checked in full before the tree is
//! touched, so a rejected write never leaves a partial mutation behind.

use bson::{Bson, Document};
use chrono::{DateTime, Utc};

use treelayer_core::{
    backend::SaveOptions,
    error::{DocumentStoreError, DocumentStoreResult},
    record::{ID_FIELD, METADATA_FIELDS},
};

use crate::tree::DocumentNode;

/// How a write treats field data already stored in the target document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteMode {
    /// Deep-merge documents, replace everything else.
    Merge,
    /// Replace the whole field data.
    Overwrite,
}

impl From<SaveOptions> for WriteMode {
    fn from(options: SaveOptions) -> Self {
        if options.avoid_merge {
            WriteMode::Overwrite
        } else {
            WriteMode::Merge
        }
    }
}

/// What must be true of the target document before a write applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Precondition {
    None,
    /// The document must already hold data (`update`).
    Exists,
    /// The document must not hold data (transactional `create`).
    Absent,
}

/// A validated write payload, split into the target id and the field data.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Payload {
    pub id: Option<String>,
    pub data: Document,
}

/// Validates `data`, extracts its id and strips metadata fields.
///
/// 32-bit integers are widened to 64-bit so stored values do not depend on
/// how the caller happened to build them.
pub(crate) fn prepare_payload(data: Document) -> DocumentStoreResult<Payload> {
    let id = match data.get(ID_FIELD) {
        None | Some(Bson::Null) => None,
        Some(Bson::String(id)) => Some(id.clone()),
        Some(other) => {
            return Err(DocumentStoreError::InvalidDocument(format!(
                "document id must be a string, got {:?}",
                other.element_type()
            )));
        }
    };

    let mut fields = Document::new();
    for (key, value) in data {
        if METADATA_FIELDS.contains(&key.as_str()) {
            continue;
        }
        let value = normalize_value(value, &key)?;
        fields.insert(key, value);
    }

    Ok(Payload { id, data: fields })
}

fn normalize_value(value: Bson, field: &str) -> DocumentStoreResult<Bson> {
    match value {
        Bson::Null
        | Bson::Boolean(_)
        | Bson::Int64(_)
        | Bson::Double(_)
        | Bson::String(_)
        | Bson::DateTime(_) => Ok(value),
        Bson::Int32(v) => Ok(Bson::Int64(v as i64)),
        Bson::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| normalize_value(item, &format!("{field}.{index}")))
            .collect::<DocumentStoreResult<Vec<_>>>()
            .map(Bson::Array),
        Bson::Document(doc) => {
            let mut normalized = Document::new();
            for (key, item) in doc {
                let item = normalize_value(item, &format!("{field}.{key}"))?;
                normalized.insert(key, item);
            }
            Ok(Bson::Document(normalized))
        }
        Bson::Undefined => Err(DocumentStoreError::InvalidDocument(format!(
            "Data contains undefined at '{field}'"
        ))),
        Bson::JavaScriptCode(_) | Bson::JavaScriptCodeWithScope(_) => Err(
            DocumentStoreError::InvalidDocument(format!("Data contains a function at '{field}'")),
        ),
        other => Err(DocumentStoreError::InvalidDocument(format!(
            "unsupported value of type {:?} at '{field}'",
            other.element_type()
        ))),
    }
}

/// Deep-merges `source` into `target`.
///
/// Two documents at the same key merge key by key. Arrays are atomic: an
/// incoming array replaces the stored value wholesale. Any other incoming
/// value replaces the stored one.
pub(crate) fn merge_document(target: &mut Document, source: Document) {
    for (key, incoming) in source {
        match incoming {
            Bson::Document(incoming_doc) => {
                if let Some(Bson::Document(existing)) = target.get_mut(&key) {
                    merge_document(existing, incoming_doc);
                } else {
                    target.insert(key, Bson::Document(incoming_doc));
                }
            }
            Bson::Array(items) => {
                target.insert(key, Bson::Array(items));
            }
            other => {
                target.insert(key, other);
            }
        }
    }
}

/// Applies field data to a node and stamps its timestamps.
///
/// The first write sets `created_at`; every write sets `updated_at`.
pub(crate) fn apply_write(node: &mut DocumentNode, data: Document, mode: WriteMode, now: DateTime<Utc>) {
    match node.data.as_mut() {
        None => {
            node.created_at = Some(now);
            node.data = Some(data);
        }
        Some(existing) => match mode {
            WriteMode::Merge => merge_document(existing, data),
            WriteMode::Overwrite => *existing = data,
        },
    }
    node.updated_at = Some(now);

    tracing::trace!(?mode, "applied write");
}
