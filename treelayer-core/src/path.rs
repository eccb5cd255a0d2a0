//! Typed hierarchical paths.
//!
//! A path alternates collection names and document ids:
//! `"accounts/a1/reservations/r9"`. An even number of segments addresses a
//! document (zero segments is the root document), an odd number addresses a
//! collection. Paths are parsed once into [`DocumentPath`] or
//! [`CollectionPath`] and carried as typed `(collection, id)` [`Step`]s from
//! then on.

use std::fmt;

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// One level of descent: a collection name and a document id inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Step {
    pub collection: String,
    pub id: String,
}

/// Address of a document node. The empty path is the root document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    steps: Vec<Step>,
}

/// Address of a collection node: the document holding it plus its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    parent: DocumentPath,
    name: String,
}

/// Either kind of path, as produced by [`TreePath::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreePath {
    Document(DocumentPath),
    Collection(CollectionPath),
}

fn segments(path: &str) -> DocumentStoreResult<Vec<&str>> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let parts = trimmed.split('/').collect::<Vec<_>>();
    if parts.iter().any(|part| part.is_empty()) {
        return Err(DocumentStoreError::InvalidPath(format!(
            "empty segment in path '{path}'"
        )));
    }

    Ok(parts)
}

fn pair_up(parts: &[&str]) -> Vec<Step> {
    parts
        .chunks_exact(2)
        .map(|pair| Step {
            collection: pair[0].to_string(),
            id: pair[1].to_string(),
        })
        .collect()
}

impl TreePath {
    pub fn parse(path: &str) -> DocumentStoreResult<Self> {
        let parts = segments(path)?;

        if parts.len() % 2 == 0 {
            Ok(TreePath::Document(DocumentPath { steps: pair_up(&parts) }))
        } else {
            let (last, rest) = parts
                .split_last()
                .ok_or_else(|| DocumentStoreError::InvalidPath(path.to_string()))?;

            Ok(TreePath::Collection(CollectionPath {
                parent: DocumentPath { steps: pair_up(rest) },
                name: last.to_string(),
            }))
        }
    }
}

impl DocumentPath {
    /// The root document, parent of every top-level collection.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a document path, rejecting paths with an odd number of segments.
    pub fn parse(path: &str) -> DocumentStoreResult<Self> {
        match TreePath::parse(path)? {
            TreePath::Document(doc) => Ok(doc),
            TreePath::Collection(_) => Err(DocumentStoreError::InvalidPath(format!(
                "'{path}' addresses a collection, expected a document path"
            ))),
        }
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The id of the addressed document, `None` for the root.
    pub fn id(&self) -> Option<&str> {
        self.steps.last().map(|step| step.id.as_str())
    }

    /// Descends into a sub-collection of this document.
    pub fn collection(&self, name: impl Into<String>) -> CollectionPath {
        CollectionPath {
            parent: self.clone(),
            name: name.into(),
        }
    }
}

impl CollectionPath {
    /// Parses a collection path, rejecting paths with an even number of segments.
    pub fn parse(path: &str) -> DocumentStoreResult<Self> {
        match TreePath::parse(path)? {
            TreePath::Collection(col) => Ok(col),
            TreePath::Document(_) => Err(DocumentStoreError::InvalidPath(format!(
                "'{path}' addresses a document, expected a collection path"
            ))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> &DocumentPath {
        &self.parent
    }

    /// Addresses the document `id` inside this collection.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidPath`] if `id` is empty or contains `/`.
    pub fn document(&self, id: &str) -> DocumentStoreResult<DocumentPath> {
        if id.is_empty() || id.contains('/') {
            return Err(DocumentStoreError::InvalidPath(format!(
                "invalid document id '{id}' in collection '{self}'"
            )));
        }

        let mut steps = self.parent.steps.clone();
        steps.push(Step {
            collection: self.name.clone(),
            id: id.to_string(),
        });

        Ok(DocumentPath { steps })
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, step) in self.steps.iter().enumerate() {
            if index > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}/{}", step.collection, step.id)?;
        }
        Ok(())
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parent.is_root() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}/{}", self.parent, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_collection_paths() {
        let path = CollectionPath::parse("accounts/a1/reservations").unwrap();
        assert_eq!(path.name(), "reservations");
        assert_eq!(path.parent().steps().len(), 1);
        assert_eq!(path.parent().id(), Some("a1"));
        assert_eq!(path.to_string(), "accounts/a1/reservations");
    }

    #[test]
    fn parses_document_paths_and_root() {
        let path = DocumentPath::parse("/accounts/a1/reservations/r1/").unwrap();
        assert_eq!(path.id(), Some("r1"));
        assert_eq!(path.to_string(), "accounts/a1/reservations/r1");

        assert!(DocumentPath::parse("").unwrap().is_root());
    }

    #[test]
    fn rejects_parity_mismatches() {
        assert!(matches!(
            CollectionPath::parse("accounts/a1"),
            Err(DocumentStoreError::InvalidPath(_))
        ));
        assert!(matches!(
            DocumentPath::parse("accounts"),
            Err(DocumentStoreError::InvalidPath(_))
        ));
        assert!(CollectionPath::parse("").is_err());
    }

    #[test]
    fn rejects_empty_segments_and_bad_ids() {
        assert!(TreePath::parse("accounts//reservations").is_err());

        let accounts = CollectionPath::parse("accounts").unwrap();
        assert!(accounts.document("").is_err());
        assert!(accounts.document("a/b").is_err());
        assert_eq!(accounts.document("a1").unwrap().to_string(), "accounts/a1");
    }
}
