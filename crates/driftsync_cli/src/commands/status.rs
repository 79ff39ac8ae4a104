//! Status command implementation.

use crate::note::Note;
use driftsync_model::{reconcile, WorkPlan};
use driftsync_store::{FileStore, LocalStore};
use serde::Serialize;
use std::path::Path;

/// Pending work between the two stores.
#[derive(Debug, Serialize)]
pub struct StatusResult {
    /// Entities in the local store, tombstones included.
    pub local_count: usize,
    /// Entities in the remote store, tombstones included.
    pub remote_count: usize,
    /// Ids a push would send.
    pub to_push: Vec<String>,
    /// Ids a pull would bring in.
    pub to_pull: Vec<String>,
}

/// Compares local and remote metadata without transferring anything.
pub fn run(local: &Path, remote: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let local = FileStore::open(local)?.get_metadata::<Note>()?;
    let remote = FileStore::open(remote)?.get_metadata::<Note>()?;
    let WorkPlan { to_push, to_pull } = reconcile(&local, &remote);

    let result = StatusResult {
        local_count: local.len(),
        remote_count: remote.len(),
        to_push,
        to_pull,
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &StatusResult) {
    println!("Local entities:  {}", result.local_count);
    println!("Remote entities: {}", result.remote_count);
    if result.to_push.is_empty() && result.to_pull.is_empty() {
        println!("✓ In sync");
        return;
    }
    for id in &result.to_push {
        println!("  push  {id}");
    }
    for id in &result.to_pull {
        println!("  pull  {id}");
    }
}
