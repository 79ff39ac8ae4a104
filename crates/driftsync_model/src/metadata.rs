//! Lightweight metadata projection of an entity collection.

use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identity, last-update time and tombstone flag of one entity on one side.
///
/// Metadata is always recomputed from the owning store and never persisted
/// on its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Entity identifier.
    pub id: String,
    /// Last time the entity was written on this side.
    pub last_updated: Timestamp,
    /// Whether the entity is a tombstone.
    pub deleted: bool,
}

impl Metadata {
    /// Creates live (non-deleted) metadata.
    pub fn new(id: impl Into<String>, last_updated: impl Into<Timestamp>) -> Self {
        Self {
            id: id.into(),
            last_updated: last_updated.into(),
            deleted: false,
        }
    }

    /// Creates tombstone metadata.
    pub fn tombstone(id: impl Into<String>, last_updated: impl Into<Timestamp>) -> Self {
        Self {
            id: id.into(),
            last_updated: last_updated.into(),
            deleted: true,
        }
    }

    /// Returns true if this entry replaces `other` when both describe the
    /// same id: the later timestamp wins and a tombstone wins a tie.
    #[must_use]
    pub fn supersedes(&self, other: &Metadata) -> bool {
        (self.last_updated, self.deleted) > (other.last_updated, other.deleted)
    }
}

/// Metadata of one side indexed by entity id.
#[derive(Debug, Clone, Default)]
pub struct MetadataIndex {
    by_id: HashMap<String, Metadata>,
}

impl MetadataIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from a metadata scan.
    ///
    /// A duplicated id keeps the most recently updated entry, with a tombstone
    /// winning a timestamp tie.
    pub fn from_metadata(metadata: impl IntoIterator<Item = Metadata>) -> Self {
        let mut index = Self::new();
        for entry in metadata {
            index.insert(entry);
        }
        index
    }

    /// Adds an entry, keeping the freshest entry per id.
    pub fn insert(&mut self, entry: Metadata) {
        match self.by_id.get(&entry.id) {
            Some(existing) if !entry.supersedes(existing) => {}
            _ => {
                self.by_id.insert(entry.id.clone(), entry);
            }
        }
    }

    /// Looks up the entry for an id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Metadata> {
        self.by_id.get(id)
    }

    /// Returns true if the id is known.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Returns the number of indexed ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns true if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Iterates over the indexed entries in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Metadata> {
        self.by_id.values()
    }

    /// Returns the indexed entries as a vector sorted by id.
    #[must_use]
    pub fn to_sorted_vec(&self) -> Vec<Metadata> {
        let mut entries: Vec<Metadata> = self.by_id.values().cloned().collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries
    }
}

impl FromIterator<Metadata> for MetadataIndex {
    fn from_iter<I: IntoIterator<Item = Metadata>>(iter: I) -> Self {
        Self::from_metadata(iter)
    }
}
