//! Benchmark utilities.

use driftsync_model::Metadata;
use driftsync_testkit::Note;
use rand::Rng;

/// Generates `count` metadata entries with ids `e0..` and random timestamps.
///
/// About one entry in `tombstone_every` is a tombstone.
pub fn random_metadata(count: usize, tombstone_every: u32) -> Vec<Metadata> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| Metadata {
            id: format!("e{i}"),
            last_updated: rng.gen_range(0..1_000_000i64).into(),
            deleted: rng.gen_ratio(1, tombstone_every),
        })
        .collect()
}

/// Generates a local and a remote side sharing `overlap` percent of ids.
pub fn diverged_sides(count: usize, overlap: usize) -> (Vec<Metadata>, Vec<Metadata>) {
    let local = random_metadata(count, 20);
    let shared = count * overlap / 100;
    let mut remote = random_metadata(shared, 20);
    remote.extend(
        random_metadata(count - shared, 20)
            .into_iter()
            .map(|mut entry| {
                entry.id = format!("r{}", entry.id);
                entry
            }),
    );
    (local, remote)
}

/// Generates notes with random bodies of `body_size` bytes.
pub fn random_notes(count: usize, body_size: usize) -> Vec<Note> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            let body: String = (0..body_size)
                .map(|_| rng.gen_range(b'a'..=b'z') as char)
                .collect();
            Note::new(format!("n{i}"), rng.gen_range(0..1_000_000i64)).with_body(body)
        })
        .collect()
}
