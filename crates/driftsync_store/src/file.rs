//! Directory-backed local store.
//!
//! Layout:
//!
//! ```text
//! <store_path>/
//! ├─ LOCK              # Advisory lock for single-process access
//! ├─ notes.cbor        # One CBOR table file per entity type
//! └─ notes.cbor.tmp    # Staging file while a write block commits
//! ```

use crate::error::{StoreError, StoreResult};
use crate::record::RecordTable;
use crate::store::LocalStore;
use fs2::FileExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const LOCK_FILE: &str = "LOCK";
const TABLE_EXTENSION: &str = "cbor";
const TEMP_SUFFIX: &str = "tmp";

/// A persistent local store kept in a directory.
///
/// Tables are loaded lazily on first access and cached. Every write block
/// stages a copy of the table, writes it to a temporary file, syncs it and
/// renames it over the table file before the cached copy is replaced, so a
/// crash mid-commit leaves the previous table intact.
///
/// Each table has its own lock. A write block on one entity type holds only
/// that table's lock while it syncs, so other entity types stay readable and
/// writable.
///
/// # Example
///
/// ```rust,ignore
/// use driftsync_store::{FileStore, LocalStore};
///
/// let store = FileStore::open(Path::new("local-data"))?;
/// store.save(&note)?;
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    tables: RwLock<HashMap<&'static str, Arc<RwLock<RecordTable>>>>,
    _lock_file: File,
}

impl FileStore {
    /// Opens or creates a store directory and takes its exclusive lock.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Locked`] if another process holds the directory,
    /// or an I/O error if it cannot be created.
    pub fn open(path: &Path) -> StoreResult<Self> {
        fs::create_dir_all(path)?;

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked {
                path: path.to_path_buf(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            tables: RwLock::new(HashMap::new()),
            _lock_file: lock_file,
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn table_path(&self, entity: &str) -> StoreResult<PathBuf> {
        let valid = !entity.is_empty()
            && entity
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidEntityName(entity.to_string()));
        }
        Ok(self.path.join(format!("{entity}.{TABLE_EXTENSION}")))
    }

    fn load_table(&self, entity: &str) -> StoreResult<RecordTable> {
        let path = self.table_path(entity)?;
        if !path.exists() {
            return Ok(RecordTable::new());
        }

        let reader = BufReader::new(File::open(&path)?);
        let table: RecordTable = ciborium::from_reader(reader)
            .map_err(|e| StoreError::Corrupted(format!("{}: {e}", path.display())))?;
        debug!(entity, records = table.len(), "loaded table");
        Ok(table)
    }

    fn persist_table(&self, entity: &str, table: &RecordTable) -> StoreResult<()> {
        let path = self.table_path(entity)?;
        let temp_path = path.with_extension(format!("{TABLE_EXTENSION}.{TEMP_SUFFIX}"));

        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        ciborium::into_writer(table, &mut writer)
            .map_err(|e| StoreError::Corrupted(format!("{}: {e}", temp_path.display())))?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        fs::rename(&temp_path, &path)?;
        Ok(())
    }

    /// Returns the cached table for `entity`, loading it on first access.
    ///
    /// The map lock is only held for the lookup; callers lock the returned
    /// table on their own.
    fn table(&self, entity: &'static str) -> StoreResult<Arc<RwLock<RecordTable>>> {
        if let Some(table) = self.tables.read().get(entity) {
            return Ok(Arc::clone(table));
        }
        let mut tables = self.tables.write();
        if let Some(table) = tables.get(entity) {
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(RwLock::new(self.load_table(entity)?));
        tables.insert(entity, Arc::clone(&table));
        Ok(table)
    }
}

impl LocalStore for FileStore {
    fn read_table<R>(
        &self,
        entity: &'static str,
        f: impl FnOnce(&RecordTable) -> R,
    ) -> StoreResult<R> {
        let table = self.table(entity)?;
        let guard = table.read();
        Ok(f(&guard))
    }

    fn write_table<R>(
        &self,
        entity: &'static str,
        f: impl FnOnce(&mut RecordTable) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let table = self.table(entity)?;
        let mut current = table.write();

        let mut staged = current.clone();
        let result = f(&mut staged)?;
        self.persist_table(entity, &staged)?;
        *current = staged;

        Ok(result)
    }
}
