//! Conversion between the live tree and [`TreeSnapshot`]s.

use chrono::{DateTime, Utc};

use treelayer_core::{
    error::DocumentStoreResult,
    snapshot::{CollectionSnapshot, TreeSnapshot, decode_document, encode_document},
};

use crate::tree::{CollectionNode, DocumentNode};

impl DocumentNode {
    /// Snapshots this node and everything below it.
    pub fn to_snapshot(&self) -> DocumentStoreResult<TreeSnapshot> {
        let data = self.data.as_ref().map(encode_document).transpose()?;

        let collections = self
            .collections
            .iter()
            .map(|(name, collection)| Ok((name.clone(), collection.to_snapshot()?)))
            .collect::<DocumentStoreResult<_>>()?;

        Ok(TreeSnapshot {
            data,
            created_at: self.created_at,
            updated_at: self.updated_at,
            collections,
        })
    }

    /// Rebuilds a node, and everything below it, from a snapshot.
    ///
    /// Legacy timestamp documents in the field data come back as dates. Nodes
    /// holding data without timestamps are stamped with `now`.
    pub fn from_snapshot(snapshot: TreeSnapshot, now: DateTime<Utc>) -> DocumentStoreResult<Self> {
        let data = snapshot.data.map(decode_document).transpose()?;

        // A node with data always carries both timestamps.
        let (created_at, updated_at) = match (&data, snapshot.created_at, snapshot.updated_at) {
            (None, created_at, updated_at) => (created_at, updated_at),
            (Some(_), Some(created_at), updated_at) => {
                (Some(created_at), Some(updated_at.unwrap_or(created_at)))
            }
            (Some(_), None, Some(updated_at)) => (Some(updated_at), Some(updated_at)),
            (Some(_), None, None) => {
                tracing::warn!("snapshot node has data but no timestamps, stamping with now");
                (Some(now), Some(now))
            }
        };

        let collections = snapshot
            .collections
            .into_iter()
            .map(|(name, collection)| Ok((name, CollectionNode::from_snapshot(collection, now)?)))
            .collect::<DocumentStoreResult<_>>()?;

        Ok(DocumentNode {
            data,
            created_at,
            updated_at,
            collections,
        })
    }
}

impl CollectionNode {
    fn to_snapshot(&self) -> DocumentStoreResult<CollectionSnapshot> {
        let documents = self
            .documents
            .iter()
            .map(|(id, node)| Ok((id.clone(), node.to_snapshot()?)))
            .collect::<DocumentStoreResult<_>>()?;

        Ok(CollectionSnapshot { documents })
    }

    fn from_snapshot(snapshot: CollectionSnapshot, now: DateTime<Utc>) -> DocumentStoreResult<Self> {
        let documents = snapshot
            .documents
            .into_iter()
            .map(|(id, node)| Ok((id, DocumentNode::from_snapshot(node, now)?)))
            .collect::<DocumentStoreResult<_>>()?;

        Ok(CollectionNode { documents })
    }
}
