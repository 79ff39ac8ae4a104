//! Local note commands.

use crate::note::Note;
use driftsync_store::{FileStore, LocalStore};
use std::path::Path;
use tracing::info;

/// Creates a note in the local store.
pub fn add(local: &Path, body: String, id: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::open(local)?;
    let note = Note::create(body, id);
    store.save(&note)?;
    info!(id = %note.id, "note created");
    println!("{}", note.id);
    Ok(())
}

/// Lists local notes, tombstones only when `all` is set.
pub fn list(local: &Path, all: bool, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::open(local)?;
    let notes: Vec<Note> = store
        .get_all::<Note>()?
        .into_iter()
        .filter(|note| all || !note.deleted)
        .collect();

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&notes)?),
        _ => {
            if notes.is_empty() {
                println!("No notes");
            }
            for note in &notes {
                let marker = if note.deleted { " (deleted)" } else { "" };
                println!("{}  {}  {}{}", note.id, note.last_updated, note.body, marker);
            }
        }
    }
    Ok(())
}

/// Turns a local note into a tombstone.
pub fn delete(local: &Path, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::open(local)?;
    store.delete::<Note>(id)?;
    info!(id, "note deleted");
    println!("✓ Deleted {id}");
    Ok(())
}
