//! The in-memory document tree.
//!
//! The store is a single root [`DocumentNode`]; top-level collections hang off
//! it. Walking a path comes in two flavours: the creating walk used by writes
//! ([`DocumentNode::document_mut`]), which materializes missing collections
//! and documents, and the non-creating walks used by reads, deletes and
//! clears, which stop at the first miss.

use std::collections::BTreeMap;

use bson::Document;
use chrono::{DateTime, Utc};

use treelayer_core::{
    path::{CollectionPath, DocumentPath},
    record::Record,
};

/// A document node. `data` stays `None` until the first write, so a node can
/// exist (as the parent of a sub-collection) without the document existing.
#[derive(Debug, Clone, Default)]
pub(crate) struct DocumentNode {
    pub data: Option<Document>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub collections: BTreeMap<String, CollectionNode>,
}

/// A collection node, documents ordered by id.
#[derive(Debug, Clone, Default)]
pub(crate) struct CollectionNode {
    pub documents: BTreeMap<String, DocumentNode>,
}

impl DocumentNode {
    /// Walks to a document, creating every missing node on the way.
    pub fn document_mut(&mut self, path: &DocumentPath) -> &mut DocumentNode {
        let mut current = self;
        for step in path.steps() {
            current = current
                .collections
                .entry(step.collection.clone())
                .or_default()
                .documents
                .entry(step.id.clone())
                .or_default();
        }
        current
    }

    pub fn document(&self, path: &DocumentPath) -> Option<&DocumentNode> {
        let mut current = self;
        for step in path.steps() {
            current = current
                .collections
                .get(&step.collection)?
                .documents
                .get(&step.id)?;
        }
        Some(current)
    }

    pub fn collection(&self, path: &CollectionPath) -> Option<&CollectionNode> {
        self.document(path.parent())?.collections.get(path.name())
    }

    /// Mutable walk that does not create anything.
    pub fn collection_existing_mut(&mut self, path: &CollectionPath) -> Option<&mut CollectionNode> {
        let mut current = self;
        for step in path.parent().steps() {
            current = current
                .collections
                .get_mut(&step.collection)?
                .documents
                .get_mut(&step.id)?;
        }
        current.collections.get_mut(path.name())
    }

    /// The record view of this node, if the document holds data.
    pub fn to_record(&self, id: &str, raw_path: String) -> Option<Record> {
        let data = self.data.as_ref()?;
        let created_at = self.created_at?;

        Some(Record {
            id: id.to_string(),
            created_at,
            updated_at: self.updated_at.unwrap_or(created_at),
            raw_path,
            data: data.clone(),
        })
    }
}

impl CollectionNode {
    /// Records for every existing document, in id order.
    ///
    /// `collection_path` is the full path of this collection, used to build
    /// each record's raw path.
    pub fn records(&self, collection_path: &str) -> Vec<Record> {
        self.documents
            .iter()
            .filter_map(|(id, node)| node.to_record(id, format!("{collection_path}/{id}")))
            .collect()
    }
}

/// Visits every collection below `node`, depth first, parents before children.
///
/// The callback receives the collection's full path string and the node.
pub(crate) fn walk_collections<'a>(
    node: &'a DocumentNode,
    prefix: &str,
    visit: &mut dyn FnMut(&str, &str, &'a CollectionNode),
) {
    for (name, collection) in &node.collections {
        let collection_path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };

        visit(name, &collection_path, collection);

        for (id, child) in &collection.documents {
            walk_collections(child, &format!("{collection_path}/{id}"), visit);
        }
    }
}
