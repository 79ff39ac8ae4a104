//! Stored records and per-entity tables.

use driftsync_model::{encode_entity, Metadata, ModelResult, SyncEntity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entity as held by a store: its metadata and its encoded payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Metadata projection, kept in step with the payload.
    pub metadata: Metadata,
    /// CBOR-encoded entity.
    pub payload: Vec<u8>,
}

impl StoredRecord {
    /// Encodes an entity into a record.
    pub fn from_entity<T: SyncEntity>(entity: &T) -> ModelResult<Self> {
        Ok(Self {
            metadata: entity.metadata(),
            payload: encode_entity(entity)?,
        })
    }
}

/// All records of one entity type keyed by id.
pub type RecordTable = BTreeMap<String, StoredRecord>;
