//! Reconciliation engine.
//!
//! Decides from metadata alone which entities must move in which direction.
//! Conflicts resolve last-write-wins by timestamp, with tombstones on the
//! receiving side dominating every timestamp comparison.

use crate::entity::SyncEntity;
use crate::metadata::{Metadata, MetadataIndex};
use std::collections::HashMap;

/// Ids that must move in each direction for one pair of metadata sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkPlan {
    /// Ids to send from local to remote, sorted.
    pub to_push: Vec<String>,
    /// Ids to bring from remote to local, sorted.
    pub to_pull: Vec<String>,
}

impl WorkPlan {
    /// Returns true if neither direction has work.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_push.is_empty() && self.to_pull.is_empty()
    }
}

/// Decides whether `source` must be transferred to a side whose entry for the
/// same id is `receiving`.
///
/// This is the single comparison used for both directions:
/// - no receiving entry: transfer (new entity)
/// - receiving tombstone: no-op, whatever the timestamps
/// - receiving entry strictly older: transfer
/// - otherwise: no-op, so equal timestamps never oscillate
#[must_use]
pub fn needs_transfer(source: &Metadata, receiving: Option<&Metadata>) -> bool {
    match receiving {
        None => true,
        Some(entry) if entry.deleted => false,
        Some(entry) => entry.last_updated < source.last_updated,
    }
}

/// Computes the ids to push and pull for a local and a remote metadata set.
///
/// The result is deterministic: both lists are sorted and deduplicated.
#[must_use]
pub fn reconcile(local: &[Metadata], remote: &[Metadata]) -> WorkPlan {
    let local_index = MetadataIndex::from_metadata(local.iter().cloned());
    let remote_index = MetadataIndex::from_metadata(remote.iter().cloned());

    WorkPlan {
        to_push: outgoing_ids(&local_index, &remote_index),
        to_pull: outgoing_ids(&remote_index, &local_index),
    }
}

/// Ids of `entries` that must be sent to the side described by `counterpart`.
#[must_use]
pub fn select_outgoing_ids(entries: &[Metadata], counterpart: &MetadataIndex) -> Vec<String> {
    let sending = MetadataIndex::from_metadata(entries.iter().cloned());
    outgoing_ids(&sending, counterpart)
}

/// Full entities of `entities` that must be sent to the side described by
/// `counterpart`, in input order.
pub fn select_outgoing<'a, T: SyncEntity>(
    entities: &'a [T],
    counterpart: &MetadataIndex,
) -> Vec<&'a T> {
    entities
        .iter()
        .filter(|entity| needs_transfer(&entity.metadata(), counterpart.get(entity.id())))
        .collect()
}

/// Collapses `entities` to one version per id, keeping the freshest version
/// under [`Metadata::supersedes`]. First-seen order is preserved.
pub fn freshest_by_id<T: SyncEntity>(entities: Vec<T>) -> Vec<T> {
    let mut slots: HashMap<String, usize> = HashMap::with_capacity(entities.len());
    let mut kept: Vec<T> = Vec::with_capacity(entities.len());
    for entity in entities {
        match slots.get(entity.id()) {
            Some(&slot) => {
                if entity.metadata().supersedes(&kept[slot].metadata()) {
                    kept[slot] = entity;
                }
            }
            None => {
                slots.insert(entity.id().to_string(), kept.len());
                kept.push(entity);
            }
        }
    }
    kept
}

fn outgoing_ids(sending: &MetadataIndex, receiving: &MetadataIndex) -> Vec<String> {
    let mut ids: Vec<String> = sending
        .iter()
        .filter(|entry| needs_transfer(entry, receiving.get(&entry.id)))
        .map(|entry| entry.id.clone())
        .collect();
    ids.sort();
    ids
}
