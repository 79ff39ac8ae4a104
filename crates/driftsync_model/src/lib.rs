//! # DriftSync Model
//!
//! Sync metadata and the reconciliation rule for DriftSync.
//!
//! This crate provides:
//! - `Timestamp` and `Metadata`, the id + last-update + tombstone projection
//!   used for cheap diffing
//! - `MetadataIndex` for id lookups over one side's metadata
//! - The entity capability traits combined by `SyncEntity`
//! - CBOR payload encoding for entities
//! - The reconciliation engine (`reconcile`, `select_outgoing`)
//!
//! This is a pure crate with no I/O operations.
//!
//! ## Reconciliation rule
//!
//! For every entry on the sending side, compared with the receiving side:
//!
//! | Receiving side          | Result   |
//! |-------------------------|----------|
//! | no entry                | transfer |
//! | tombstone               | no-op    |
//! | older than sender       | transfer |
//! | same age or newer       | no-op    |
//!
//! The same rule serves both directions.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod entity;
mod error;
mod metadata;
mod reconcile;
mod timestamp;

pub use entity::{
    decode_entity, encode_entity, new_entity_id, CopyableWithNewId, HasIdentity, HasTombstone,
    HasUpdateTimestamp, SyncEntity,
};
pub use error::{ModelError, ModelResult};
pub use metadata::{Metadata, MetadataIndex};
pub use reconcile::{
    freshest_by_id, needs_transfer, reconcile, select_outgoing, select_outgoing_ids, WorkPlan,
};
pub use timestamp::Timestamp;
