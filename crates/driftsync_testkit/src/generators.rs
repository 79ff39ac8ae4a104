//! Property-based test generators using proptest.
//!
//! Timestamps are drawn from a narrow range so equal-timestamp ties and
//! overlapping ids between sides come up often.

use crate::entity::Note;
use driftsync_model::Metadata;
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Strategy for generating short entity ids.
pub fn entity_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-f]{1,2}").expect("Invalid regex")
}

/// Strategy for generating one metadata entry.
pub fn metadata_strategy() -> impl Strategy<Value = Metadata> {
    (entity_id_strategy(), 0i64..20, prop::bool::weighted(0.2)).prop_map(
        |(id, ts, deleted)| Metadata {
            id,
            last_updated: ts.into(),
            deleted,
        },
    )
}

/// Strategy for generating one side's metadata, with unique ids.
pub fn metadata_set_strategy() -> impl Strategy<Value = Vec<Metadata>> {
    prop::collection::vec(metadata_strategy(), 0..16).prop_map(|entries| {
        let unique: BTreeMap<String, Metadata> = entries
            .into_iter()
            .map(|entry| (entry.id.clone(), entry))
            .collect();
        unique.into_values().collect()
    })
}

/// Strategy for generating notes with unique ids.
pub fn notes_strategy() -> impl Strategy<Value = Vec<Note>> {
    metadata_set_strategy().prop_map(|metadata| metadata.iter().map(Note::from_metadata).collect())
}
