//! The note entity managed by the CLI.

use driftsync_model::{
    new_entity_id, CopyableWithNewId, HasIdentity, HasTombstone, HasUpdateTimestamp, SyncEntity,
    Timestamp,
};
use serde::{Deserialize, Serialize};

/// A text note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub body: String,
    pub last_updated: Timestamp,
    pub deleted: bool,
}

impl Note {
    /// Creates a note stamped now, with a random id unless one is given.
    pub fn create(body: String, id: Option<String>) -> Self {
        Self {
            id: id.unwrap_or_else(new_entity_id),
            body,
            last_updated: Timestamp::now(),
            deleted: false,
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
