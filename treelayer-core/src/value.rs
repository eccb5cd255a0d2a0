//! Field value helpers shared by drivers.
//!
//! Field data is a `bson::Document` restricted to null, booleans, numbers,
//! strings, dates, arrays and nested documents. Two representations of time
//! reach the store: native dates, and timestamp-shaped documents
//! (`{ "_seconds": .., "_nanoseconds": .. }`) produced by external snapshots.
//! [`Temporal::recognize`] is the one place that tells them apart.

use bson::{Bson, DateTime, Document};

const SECONDS_KEY: &str = "_seconds";
const NANOSECONDS_KEY: &str = "_nanoseconds";

/// A point in time in one of the representations the store understands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Temporal {
    /// A native BSON date (millisecond precision).
    Date(DateTime),
    /// A timestamp-shaped document.
    Timestamp { seconds: i64, nanoseconds: i64 },
}

impl Temporal {
    /// Returns the temporal reading of `value`, if it has one.
    pub fn recognize(value: &Bson) -> Option<Self> {
        match value {
            Bson::DateTime(date) => Some(Temporal::Date(*date)),
            Bson::Document(doc) => Self::recognize_timestamp(doc),
            _ => None,
        }
    }

    fn recognize_timestamp(doc: &Document) -> Option<Self> {
        let seconds = as_integer(doc.get(SECONDS_KEY)?)?;
        let nanoseconds = as_integer(doc.get(NANOSECONDS_KEY)?)?;

        Some(Temporal::Timestamp { seconds, nanoseconds })
    }

    /// Milliseconds since the Unix epoch, keeping sub-millisecond precision.
    pub fn epoch_millis(&self) -> f64 {
        match self {
            Temporal::Date(date) => date.timestamp_millis() as f64,
            Temporal::Timestamp { seconds, nanoseconds } => {
                *seconds as f64 * 1_000.0 + *nanoseconds as f64 / 1_000_000.0
            }
        }
    }

    /// Converts to a native date, truncating to millisecond precision.
    ///
    /// Returns `None` when a timestamp does not fit in 64-bit milliseconds.
    pub fn to_date(&self) -> Option<DateTime> {
        match self {
            Temporal::Date(date) => Some(*date),
            Temporal::Timestamp { seconds, nanoseconds } => seconds
                .checked_mul(1_000)
                .and_then(|millis| millis.checked_add(nanoseconds / 1_000_000))
                .map(DateTime::from_millis),
        }
    }
}

fn as_integer(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(v) => Some(*v as i64),
        Bson::Int64(v) => Some(*v),
        Bson::Double(v) if v.fract() == 0.0 => Some(*v as i64),
        _ => None,
    }
}

/// Truthiness in the dynamic-language sense.
///
/// `null`, `false`, zero, NaN and the empty string are falsy; everything
/// else, including empty arrays and documents, is truthy.
pub fn is_truthy(value: &Bson) -> bool {
    match value {
        Bson::Null | Bson::Undefined => false,
        Bson::Boolean(b) => *b,
        Bson::Int32(v) => *v != 0,
        Bson::Int64(v) => *v != 0,
        Bson::Double(v) => *v != 0.0 && !v.is_nan(),
        Bson::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Resolves a dot-separated field path inside a document.
///
/// Only nested documents are traversed; arrays are leaves.
pub fn lookup_field<'a>(doc: &'a Document, field_path: &str) -> Option<&'a Bson> {
    let mut parts = field_path.split('.');
    let mut current = doc.get(parts.next()?)?;

    for part in parts {
        current = current.as_document()?.get(part)?;
    }

    Some(current)
}
