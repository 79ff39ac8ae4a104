//! # DriftSync Store
//!
//! Local store contract and reference implementations for DriftSync.
//!
//! The sync engine reads and writes the client's local data exclusively
//! through [`LocalStore`]. Stores keep one table per entity type; each record
//! holds the entity's [`Metadata`](driftsync_model::Metadata) next to its CBOR
//! payload so metadata scans never decode payloads.
//!
//! ## Design Principles
//!
//! - Every mutation runs inside one scoped write block
//! - A write block is atomic: it either replaces the table or leaves it alone
//! - Logical deletes keep a tombstone; only `purge` removes a record
//! - Stores must be `Send + Sync` so pipelines of different entity types can
//!   share one handle
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral data
//! - [`FileStore`] - Directory-backed persistent store
//!
//! ## Example
//!
//! ```rust,ignore
//! use driftsync_store::{InMemoryStore, LocalStore};
//!
//! let store = InMemoryStore::new();
//! store.save(&note)?;
//! let metadata = store.get_metadata::<Note>()?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod record;
mod store;

pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use record::{RecordTable, StoredRecord};
pub use store::LocalStore;
