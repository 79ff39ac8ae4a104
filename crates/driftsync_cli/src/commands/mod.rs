//! CLI command implementations.

pub mod config;
pub mod notes;
pub mod status;
pub mod sync;

use crate::note::Note;
use crate::settings::Settings;
use driftsync_engine::{InProcessBackgroundScheduler, SimulatedRemote, SyncHandle, SyncService};
use driftsync_store::FileStore;
use std::path::Path;
use std::sync::Arc;

/// Local store, simulated remote and the configured note handle.
pub struct Workspace {
    pub handle: SyncHandle<Note, FileStore>,
    pub remote: Arc<SimulatedRemote<FileStore>>,
}

impl Workspace {
    /// Opens both store directories and configures the note handle.
    pub fn open(
        local: &Path,
        remote: &Path,
        settings: &Settings,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let local = Arc::new(FileStore::open(local)?);
        let remote = Arc::new(SimulatedRemote::new(Arc::new(FileStore::open(remote)?)));

        let service = SyncService::new(
            local,
            Arc::new(InProcessBackgroundScheduler::new()),
            settings.service.clone(),
        );
        let handle = service.configure::<Note>(settings.sync.clone(), remote.clone())?;
        Ok(Self { handle, remote })
    }
}
