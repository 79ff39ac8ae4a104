//! Store fixtures and test helpers.

use crate::entity::Note;
use driftsync_model::{Metadata, SyncEntity};
use driftsync_store::{FileStore, InMemoryStore, LocalStore};
use std::sync::Arc;
use tempfile::TempDir;

/// Returns an in-memory store holding `entities`.
pub fn seeded_store<T: SyncEntity>(entities: &[T]) -> Arc<InMemoryStore> {
    let store = InMemoryStore::new();
    for entity in entities {
        store.save(entity).expect("Failed to seed store");
    }
    Arc::new(store)
}

/// Returns an in-memory store holding one note per metadata entry.
pub fn store_from_metadata(metadata: &[Metadata]) -> Arc<InMemoryStore> {
    let notes: Vec<Note> = metadata.iter().map(Note::from_metadata).collect();
    seeded_store(&notes)
}

/// A file store in a temporary directory that is removed on drop.
pub struct TempFileStore {
    /// The store.
    pub store: Arc<FileStore>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: TempDir,
}

impl TempFileStore {
    /// Opens a store in a fresh temporary directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::open(temp_dir.path()).expect("Failed to open file store");
        Self {
            store: Arc::new(store),
            _temp_dir: temp_dir,
        }
    }
}

impl Default for TempFileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TempFileStore {
    type Target = Arc<FileStore>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Returns the metadata of every note in `store`.
pub fn note_metadata<S: LocalStore>(store: &S) -> Vec<Metadata> {
    store
        .get_metadata::<Note>()
        .expect("Failed to read metadata")
}

/// Installs a test tracing subscriber honouring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
