//! Tree-wide interchange format.
//!
//! A [`TreeSnapshot`] mirrors the document/collection nesting of a store as
//! plain JSON-safe data:
//!
//! ```json
//! {
//!   "data": { "name": "R1", "openedAt": { "__instance": "date", "value": "2020-01-01T00:00:00.000Z" } },
//!   "createdAt": "2020-01-01T00:00:00Z",
//!   "updatedAt": "2020-01-01T00:00:00Z",
//!   "collections": { "reviews": { "documents": { "x": { "data": null, "collections": {} } } } }
//! }
//! ```
//!
//! Dates inside field data are tagged so they survive the trip through JSON.
//! Decoding also accepts legacy timestamp documents (`_seconds`/`_nanoseconds`)
//! and turns them into dates.
//!
//! Decoding cannot tell a legacy timestamp from a plain nested document that
//! happens to have the same two integer keys, so such a document comes back
//! from an export/import round trip as a date. Queries already compare both
//! shapes as the same instant. Timestamps beyond the millisecond range of a
//! date fail to decode with [`DocumentStoreError::Serialization`].

use std::collections::BTreeMap;

use bson::{Bson, DateTime, Document};
use chrono::{DateTime as ChronoDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    value::Temporal,
};

/// Key marking a tagged value.
pub const INSTANCE_TAG: &str = "__instance";
/// Tag value for dates.
pub const DATE_INSTANCE: &str = "date";

/// Snapshot of one document node and everything below it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSnapshot {
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
    #[serde(default)]
    pub created_at: Option<ChronoDateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<ChronoDateTime<Utc>>,
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionSnapshot>,
}

/// Snapshot of one collection node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    #[serde(default)]
    pub documents: BTreeMap<String, TreeSnapshot>,
}

impl TreeSnapshot {
    /// Parses a snapshot from JSON text.
    pub fn from_json_str(json: &str) -> DocumentStoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Renders the snapshot as JSON text.
    pub fn to_json_string(&self) -> DocumentStoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Counts the document nodes in this snapshot, itself included.
    pub fn node_count(&self) -> usize {
        1 + self
            .collections
            .values()
            .flat_map(|collection| collection.documents.values())
            .map(TreeSnapshot::node_count)
            .sum::<usize>()
    }
}

/// Encodes field data into its tagged JSON form.
pub fn encode_document(doc: &Document) -> DocumentStoreResult<Map<String, Value>> {
    doc.iter()
        .map(|(key, value)| Ok((key.clone(), encode_value(value)?)))
        .collect()
}

/// Encodes one field value into its tagged JSON form.
///
/// # Errors
///
/// Returns [`DocumentStoreError::Serialization`] for non-finite doubles and
/// for BSON types that are not valid field data.
pub fn encode_value(value: &Bson) -> DocumentStoreResult<Value> {
    Ok(match value {
        Bson::Null => Value::Null,
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(v) => Value::from(*v),
        Bson::Int64(v) => Value::from(*v),
        Bson::Double(v) => Value::Number(Number::from_f64(*v).ok_or_else(|| {
            DocumentStoreError::Serialization(format!("cannot encode non-finite number {v}"))
        })?),
        Bson::String(s) => Value::String(s.clone()),
        Bson::DateTime(date) => encode_date(date)?,
        Bson::Array(items) => Value::Array(
            items
                .iter()
                .map(encode_value)
                .collect::<DocumentStoreResult<Vec<_>>>()?,
        ),
        Bson::Document(doc) => Value::Object(encode_document(doc)?),
        other => {
            return Err(DocumentStoreError::Serialization(format!(
                "unsupported field value {other:?}"
            )));
        }
    })
}

fn encode_date(date: &DateTime) -> DocumentStoreResult<Value> {
    let instant = ChronoDateTime::<Utc>::from_timestamp_millis(date.timestamp_millis())
        .ok_or_else(|| DocumentStoreError::Serialization(format!("date out of range: {date}")))?;

    let mut tagged = Map::new();
    tagged.insert(INSTANCE_TAG.to_string(), Value::String(DATE_INSTANCE.to_string()));
    tagged.insert(
        "value".to_string(),
        Value::String(instant.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );

    Ok(Value::Object(tagged))
}

/// Decodes tagged JSON field data.
pub fn decode_document(map: Map<String, Value>) -> DocumentStoreResult<Document> {
    let mut doc = Document::new();
    for (key, value) in map {
        doc.insert(key, decode_value(value)?);
    }
    Ok(doc)
}

/// Decodes one tagged JSON value.
///
/// Integers become 64-bit integers, other numbers doubles, date tags and
/// legacy timestamp documents become dates.
pub fn decode_value(value: Value) -> DocumentStoreResult<Bson> {
    Ok(match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(b),
        Value::Number(n) => match n.as_i64() {
            Some(v) => Bson::Int64(v),
            None => Bson::Double(n.as_f64().ok_or_else(|| {
                DocumentStoreError::Serialization(format!("unrepresentable number {n}"))
            })?),
        },
        Value::String(s) => Bson::String(s),
        Value::Array(items) => Bson::Array(
            items
                .into_iter()
                .map(decode_value)
                .collect::<DocumentStoreResult<Vec<_>>>()?,
        ),
        Value::Object(map) => decode_object(map)?,
    })
}

fn decode_object(map: Map<String, Value>) -> DocumentStoreResult<Bson> {
    if map.get(INSTANCE_TAG).and_then(Value::as_str) == Some(DATE_INSTANCE) {
        let raw = map.get("value").and_then(Value::as_str).ok_or_else(|| {
            DocumentStoreError::Serialization("date tag without a string value".to_string())
        })?;
        let instant = ChronoDateTime::parse_from_rfc3339(raw).map_err(|err| {
            DocumentStoreError::Serialization(format!("invalid date '{raw}': {err}"))
        })?;

        return Ok(Bson::DateTime(DateTime::from_millis(instant.timestamp_millis())));
    }

    let value = Bson::Document(decode_document(map)?);
    if let Some(temporal @ Temporal::Timestamp { .. }) = Temporal::recognize(&value) {
        tracing::warn!(?temporal, "decoding legacy timestamp document as a date");
        let date = temporal.to_date().ok_or_else(|| {
            DocumentStoreError::Serialization(format!("timestamp out of range: {temporal:?}"))
        })?;
        return Ok(Bson::DateTime(date));
    }

    Ok(value)
}
