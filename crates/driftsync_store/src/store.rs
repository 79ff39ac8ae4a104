//! Local store trait definition.

use crate::error::{StoreError, StoreResult};
use crate::record::{RecordTable, StoredRecord};
use driftsync_model::{decode_entity, Metadata, ModelResult, SyncEntity, Timestamp};
use std::time::Duration;

/// The client's local store as seen by the sync engine.
///
/// Implementors provide two primitives, a scoped read and a scoped write
/// block over one entity type's [`RecordTable`]. Every entity operation is
/// built on them.
///
/// # Invariants
///
/// - `write_table` commits all of `f`'s changes or none of them; closures
///   passed to it do their fallible work before touching the table
/// - Concurrent write blocks on the same table are serialized
/// - A record's metadata always matches its payload
///
/// # Implementors
///
/// - [`crate::InMemoryStore`] - For testing
/// - [`crate::FileStore`] - For persistent storage
pub trait LocalStore: Send + Sync {
    /// Runs `f` against the table of `entity` under a read lock.
    ///
    /// A table that was never written is presented as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be loaded.
    fn read_table<R>(
        &self,
        entity: &'static str,
        f: impl FnOnce(&RecordTable) -> R,
    ) -> StoreResult<R>;

    /// Runs `f` as one atomic write block on the table of `entity`.
    ///
    /// # Errors
    ///
    /// Returns the error of `f`, or an error if the block cannot be committed.
    fn write_table<R>(
        &self,
        entity: &'static str,
        f: impl FnOnce(&mut RecordTable) -> StoreResult<R>,
    ) -> StoreResult<R>;

    /// Returns every entity of type `T`, tombstones included, ordered by id.
    fn get_all<T: SyncEntity>(&self) -> StoreResult<Vec<T>> {
        let decoded = self.read_table(T::ENTITY_NAME, |table| {
            table
                .values()
                .map(|record| decode_entity::<T>(&record.payload))
                .collect::<ModelResult<Vec<T>>>()
        })?;
        Ok(decoded?)
    }

    /// Returns the entity with `id`, if present.
    fn get<T: SyncEntity>(&self, id: &str) -> StoreResult<Option<T>> {
        let decoded = self.read_table(T::ENTITY_NAME, |table| {
            table
                .get(id)
                .map(|record| decode_entity::<T>(&record.payload))
                .transpose()
        })?;
        Ok(decoded?)
    }

    /// Returns the metadata projection of every entity of type `T`.
    fn get_metadata<T: SyncEntity>(&self) -> StoreResult<Vec<Metadata>> {
        self.read_table(T::ENTITY_NAME, |table| {
            table.values().map(|record| record.metadata.clone()).collect()
        })
    }

    /// Returns the number of stored entities of type `T`, tombstones included.
    fn count<T: SyncEntity>(&self) -> StoreResult<usize> {
        self.read_table(T::ENTITY_NAME, |table| table.len())
    }

    /// Inserts or replaces an entity.
    fn save<T: SyncEntity>(&self, entity: &T) -> StoreResult<()> {
        let record = StoredRecord::from_entity(entity)?;
        self.write_table(T::ENTITY_NAME, |table| {
            table.insert(entity.id().to_string(), record);
            Ok(())
        })
    }

    /// Logically deletes an entity by turning it into a tombstone.
    ///
    /// The tombstone is stamped strictly later than the entity's previous
    /// update so it wins against copies of that version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the entity does not exist.
    fn delete<T: SyncEntity>(&self, id: &str) -> StoreResult<()> {
        self.write_table(T::ENTITY_NAME, |table| {
            let record = table
                .get_mut(id)
                .ok_or_else(|| StoreError::not_found(T::ENTITY_NAME, id))?;
            let mut entity: T = decode_entity(&record.payload)?;
            let at = Timestamp::now()
                .max(entity.last_updated().saturating_add(Duration::from_millis(1)));
            entity.set_deleted(true);
            entity.set_last_updated(at);
            *record = StoredRecord::from_entity(&entity)?;
            Ok(())
        })
    }

    /// Physically removes an entity. Returns false if it did not exist.
    fn purge<T: SyncEntity>(&self, id: &str) -> StoreResult<bool> {
        self.write_table(T::ENTITY_NAME, |table| Ok(table.remove(id).is_some()))
    }

    /// Physically removes every entity matching `predicate`.
    ///
    /// Each removal is its own write block. `cancel` is consulted after every
    /// removal; once it returns true the sweep stops and the removals already
    /// made stay committed. Returns the number of removed entities.
    fn delete_where<T, P, C>(&self, predicate: P, cancel: C) -> StoreResult<usize>
    where
        T: SyncEntity,
        P: Fn(&T) -> bool,
        C: Fn() -> bool,
    {
        let matching = self.read_table(T::ENTITY_NAME, |table| {
            let mut ids = Vec::new();
            for (id, record) in table {
                let entity: T = decode_entity(&record.payload)?;
                if predicate(&entity) {
                    ids.push(id.clone());
                }
            }
            ModelResult::Ok(ids)
        })??;

        if cancel() {
            return Ok(0);
        }

        let mut removed = 0;
        for id in matching {
            if self.purge::<T>(&id)? {
                removed += 1;
            }
            if cancel() {
                break;
            }
        }
        Ok(removed)
    }

    /// Sets the last-update timestamp of an entity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the entity does not exist.
    fn stamp_updated<T: SyncEntity>(&self, id: &str, at: Timestamp) -> StoreResult<()> {
        self.write_table(T::ENTITY_NAME, |table| {
            let record = table
                .get_mut(id)
                .ok_or_else(|| StoreError::not_found(T::ENTITY_NAME, id))?;
            let mut entity: T = decode_entity(&record.payload)?;
            entity.set_last_updated(at);
            *record = StoredRecord::from_entity(&entity)?;
            Ok(())
        })
    }

    /// Sets the last-update timestamp of an entity only if its stored
    /// timestamp still equals `expected`.
    ///
    /// Returns `false` and leaves the record untouched if the entity was
    /// rewritten or removed since `expected` was read.
    fn stamp_updated_if<T: SyncEntity>(
        &self,
        id: &str,
        expected: Timestamp,
        at: Timestamp,
    ) -> StoreResult<bool> {
        self.write_table(T::ENTITY_NAME, |table| {
            let Some(record) = table.get_mut(id) else {
                return Ok(false);
            };
            if record.metadata.last_updated != expected {
                return Ok(false);
            }
            let mut entity: T = decode_entity(&record.payload)?;
            entity.set_last_updated(at);
            *record = StoredRecord::from_entity(&entity)?;
            Ok(true)
        })
    }
}

impl<S: LocalStore> LocalStore for std::sync::Arc<S> {
    fn read_table<R>(
        &self,
        entity: &'static str,
        f: impl FnOnce(&RecordTable) -> R,
    ) -> StoreResult<R> {
        (**self).read_table(entity, f)
    }

    fn write_table<R>(
        &self,
        entity: &'static str,
        f: impl FnOnce(&mut RecordTable) -> StoreResult<R>,
    ) -> StoreResult<R> {
        (**self).write_table(entity, f)
    }
}
