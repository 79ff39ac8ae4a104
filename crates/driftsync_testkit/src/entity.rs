//! The `Note` test entity.

use driftsync_model::{
    CopyableWithNewId, HasIdentity, HasTombstone, HasUpdateTimestamp, Metadata, SyncEntity,
    Timestamp,
};
use serde::{Deserialize, Serialize};

/// A minimal syncable entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Identifier.
    pub id: String,
    /// Last update.
    pub last_updated: Timestamp,
    /// Tombstone flag.
    pub deleted: bool,
    /// Free text.
    pub body: String,
}

impl Note {
    /// Creates a live note updated at `last_updated` milliseconds.
    pub fn new(id: impl Into<String>, last_updated: i64) -> Self {
        let id = id.into();
        Self {
            body: format!("note {id}"),
            id,
            last_updated: Timestamp::from_millis(last_updated),
            deleted: false,
        }
    }

    /// Creates a tombstone deleted at `last_updated` milliseconds.
    pub fn tombstone(id: impl Into<String>, last_updated: i64) -> Self {
        Self {
            deleted: true,
            ..Self::new(id, last_updated)
        }
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Builds a note whose sync fields match `metadata`.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let note = Self::new(metadata.id.clone(), metadata.last_updated.as_millis());
        Self {
            deleted: metadata.deleted,
            ..note
        }
    }
}

impl HasIdentity for Note {
    fn id(&self) -> &str {
        &self.id
    }
}

impl HasUpdateTimestamp for Note {
    fn last_updated(&self) -> Timestamp {
        self.last_updated
    }

    fn set_last_updated(&mut self, at: Timestamp) {
        self.last_updated = at;
    }
}

impl HasTombstone for Note {
    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn set_deleted(&mut self, deleted: bool) {
        self.deleted = deleted;
    }
}

impl CopyableWithNewId for Note {
    fn copy_with_new_id(&self, id: String) -> Self {
        Self {
            id,
            ..self.clone()
        }
    }
}

impl SyncEntity for Note {
    const ENTITY_NAME: &'static str = "notes";
}
