//! The externally visible shape of a stored document.

use std::borrow::Cow;

use bson::{Bson, DateTime, Document};
use chrono::{DateTime as ChronoDateTime, Utc};

use crate::value::lookup_field;

/// Field name under which the document id is exposed.
pub const ID_FIELD: &str = "id";
/// Field name under which the creation time is exposed.
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Field name under which the last update time is exposed.
pub const UPDATED_AT_FIELD: &str = "updatedAt";
/// Field name under which the full path of the producing node is exposed.
pub const RAW_PATH_FIELD: &str = "_rawPath";

/// Keys that are metadata and never stored inside field data.
pub const METADATA_FIELDS: [&str; 4] = [ID_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD, RAW_PATH_FIELD];

/// A document's field data together with its identity and timestamps.
///
/// `raw_path` is the full path of the node that produced the record
/// (`"accounts/a1/reservations/r9"`), which keeps identity intact when group
/// queries flatten documents from many parents.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub created_at: ChronoDateTime<Utc>,
    pub updated_at: ChronoDateTime<Utc>,
    pub raw_path: String,
    pub data: Document,
}

fn to_bson_date(value: &ChronoDateTime<Utc>) -> Bson {
    Bson::DateTime(DateTime::from_millis(value.timestamp_millis()))
}

impl Record {
    /// Resolves a dot-separated field path against the record view.
    ///
    /// `id`, `createdAt` and `updatedAt` resolve to metadata, everything else
    /// to the field data.
    pub fn get(&self, field_path: &str) -> Option<Cow<'_, Bson>> {
        match field_path {
            ID_FIELD => Some(Cow::Owned(Bson::String(self.id.clone()))),
            CREATED_AT_FIELD => Some(Cow::Owned(to_bson_date(&self.created_at))),
            UPDATED_AT_FIELD => Some(Cow::Owned(to_bson_date(&self.updated_at))),
            _ => lookup_field(&self.data, field_path).map(Cow::Borrowed),
        }
    }

    /// The flattened view: metadata fields merged with the field data.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(ID_FIELD, self.id.clone());
        doc.insert(CREATED_AT_FIELD, to_bson_date(&self.created_at));
        doc.insert(UPDATED_AT_FIELD, to_bson_date(&self.updated_at));
        doc.insert(RAW_PATH_FIELD, self.raw_path.clone());

        for (key, value) in self.data.iter() {
            doc.insert(key.clone(), value.clone());
        }

        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use chrono::TimeZone;

    fn record() -> Record {
        let at = Utc.timestamp_millis_opt(1_000).unwrap();
        Record {
            id: "r1".into(),
            created_at: at,
            updated_at: at,
            raw_path: "restaurants/r1".into(),
            data: doc! { "name": "R1", "address": { "city": "Oslo" } },
        }
    }

    #[test]
    fn resolves_metadata_and_nested_fields() {
        let record = record();
        assert_eq!(record.get("id").unwrap().as_str(), Some("r1"));
        assert_eq!(
            record.get("createdAt").unwrap().into_owned(),
            Bson::DateTime(DateTime::from_millis(1_000))
        );
        assert_eq!(record.get("address.city").unwrap().as_str(), Some("Oslo"));
        assert!(record.get("address.zip").is_none());
    }

    #[test]
    fn flattened_view_carries_metadata() {
        let doc = record().to_document();
        assert_eq!(doc.get_str("id").unwrap(), "r1");
        assert_eq!(doc.get_str("_rawPath").unwrap(), "restaurants/r1");
        assert_eq!(doc.get_str("name").unwrap(), "R1");
    }
}
