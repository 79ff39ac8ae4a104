//! Entity capability traits and payload codec.

use crate::error::{ModelError, ModelResult};
use crate::metadata::Metadata;
use crate::timestamp::Timestamp;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

/// An entity with a stable string identifier.
pub trait HasIdentity {
    /// Returns the entity's identifier.
    ///
    /// The id must not change over the entity's lifetime; use
    /// [`CopyableWithNewId`] to obtain a copy under another id.
    fn id(&self) -> &str;
}

/// An entity that records when it was last written.
pub trait HasUpdateTimestamp {
    /// Returns the last-update timestamp.
    fn last_updated(&self) -> Timestamp;

    /// Sets the last-update timestamp.
    fn set_last_updated(&mut self, at: Timestamp);
}

/// An entity that can be logically deleted.
pub trait HasTombstone {
    /// Returns true if the entity is a tombstone.
    fn is_deleted(&self) -> bool;

    /// Sets or clears the tombstone flag.
    fn set_deleted(&mut self, deleted: bool);
}

/// An entity that can be duplicated under a different identifier.
pub trait CopyableWithNewId: Sized {
    /// Returns a copy of `self` carrying `id`.
    fn copy_with_new_id(&self, id: String) -> Self;
}

/// The full capability set required by the sync pipeline.
///
/// Serialization is provided through serde; payloads are encoded with
/// [`encode_entity`] and decoded with [`decode_entity`].
///
/// # Example
///
/// ```rust
/// use driftsync_model::*;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Task {
///     id: String,
///     last_updated: Timestamp,
///     deleted: bool,
///     title: String,
/// }
///
/// impl HasIdentity for Task {
///     fn id(&self) -> &str { &self.id }
/// }
/// impl HasUpdateTimestamp for Task {
///     fn last_updated(&self) -> Timestamp { self.last_updated }
///     fn set_last_updated(&mut self, at: Timestamp) { self.last_updated = at; }
/// }
/// impl HasTombstone for Task {
///     fn is_deleted(&self) -> bool { self.deleted }
///     fn set_deleted(&mut self, deleted: bool) { self.deleted = deleted; }
/// }
/// impl CopyableWithNewId for Task {
///     fn copy_with_new_id(&self, id: String) -> Self { Task { id, ..self.clone() } }
/// }
/// impl SyncEntity for Task {
///     const ENTITY_NAME: &'static str = "tasks";
/// }
///
/// let task = Task { id: "t1".into(), last_updated: Timestamp::from_millis(5), deleted: false, title: "x".into() };
/// assert_eq!(task.metadata(), Metadata::new("t1", 5));
/// ```
pub trait SyncEntity:
    HasIdentity
    + HasUpdateTimestamp
    + HasTombstone
    + CopyableWithNewId
    + Serialize
    + DeserializeOwned
    + Clone
    + Send
    + Sync
    + 'static
{
    /// Name of the entity type; keys store tables and background task ids.
    const ENTITY_NAME: &'static str;

    /// Projects the entity onto its sync metadata.
    fn metadata(&self) -> Metadata {
        Metadata {
            id: self.id().to_string(),
            last_updated: self.last_updated(),
            deleted: self.is_deleted(),
        }
    }
}

/// Encodes an entity to CBOR bytes.
pub fn encode_entity<T: SyncEntity>(entity: &T) -> ModelResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::into_writer(entity, &mut bytes)
        .map_err(|e| ModelError::encode(T::ENTITY_NAME, e.to_string()))?;
    Ok(bytes)
}

/// Decodes an entity from CBOR bytes.
pub fn decode_entity<T: SyncEntity>(bytes: &[u8]) -> ModelResult<T> {
    ciborium::from_reader(bytes).map_err(|e| ModelError::decode(T::ENTITY_NAME, e.to_string()))
}

/// Generates a fresh random entity identifier.
#[must_use]
pub fn new_entity_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: String,
        last_updated: Timestamp,
        deleted: bool,
        label: String,
    }

    impl HasIdentity for Item {
        fn id(&self) -> &str {
            &self.id
        }
    }

    impl HasUpdateTimestamp for Item {
        fn last_updated(&self) -> Timestamp {
            self.last_updated
        }

        fn set_last_updated(&mut self, at: Timestamp) {
            self.last_updated = at;
        }
    }

    impl HasTombstone for Item {
        fn is_deleted(&self) -> bool {
            self.deleted
        }

        fn set_deleted(&mut self, deleted: bool) {
            self.deleted = deleted;
        }
    }

    impl CopyableWithNewId for Item {
        fn copy_with_new_id(&self, id: String) -> Self {
            Self {
                id,
                ..self.clone()
            }
        }
    }

    impl SyncEntity for Item {
        const ENTITY_NAME: &'static str = "items";
    }

    fn item() -> Item {
        Item {
            id: "i-1".into(),
            last_updated: Timestamp::from_millis(99),
            deleted: true,
            label: "hello".into(),
        }
    }

    #[test]
    fn metadata_projection() {
        assert_eq!(item().metadata(), Metadata::tombstone("i-1", 99));
    }

    #[test]
    fn payload_survives_codec() {
        let bytes = encode_entity(&item()).unwrap();
        let decoded: Item = decode_entity(&bytes).unwrap();
        assert_eq!(decoded, item());
    }

    #[test]
    fn garbage_payload_is_decode_error() {
        let err = decode_entity::<Item>(&[0xff, 0x00]).unwrap_err();
        assert!(matches!(err, ModelError::Decode { entity: "items", .. }));
    }

    #[test]
    fn copy_keeps_fields_and_changes_id() {
        let copy = item().copy_with_new_id("i-2".into());
        assert_eq!(copy.id, "i-2");
        assert_eq!(copy.label, "hello");
        assert_eq!(copy.last_updated, Timestamp::from_millis(99));
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(new_entity_id(), new_entity_id());
        assert_eq!(new_entity_id().len(), 36);
    }
}
