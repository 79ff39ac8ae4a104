//! Remote store abstraction.

use crate::error::{RemoteError, RemoteResult};
use async_trait::async_trait;
use driftsync_model::{select_outgoing, Metadata, MetadataIndex, SyncEntity};
use driftsync_store::{LocalStore, StoreError};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// The server side of synchronization for one entity type.
///
/// Implementations must tolerate concurrent calls; different entity types
/// and directions run independently.
#[async_trait]
pub trait RemoteStore<T>: Send + Sync {
    /// Returns the metadata of every remote entity of `entity_name`.
    async fn get_metadata(&self, entity_name: &str) -> RemoteResult<Vec<Metadata>>;

    /// Creates or updates `entity` on the remote.
    ///
    /// When `id` is given and differs from the entity's own id, the remote
    /// stores a copy of the entity under `id`.
    async fn save(&self, entity: &T, id: Option<&str>) -> RemoteResult<()>;

    /// Returns the remote entities the local side lacks or holds older
    /// versions of, given the local metadata.
    async fn fetch_updated_and_new(&self, local: &[Metadata]) -> RemoteResult<Vec<T>>;
}

/// A [`LocalStore`] exposed as a remote, with fault injection.
///
/// Used by tests and the CLI to run the full pipeline against a second store.
#[derive(Debug)]
pub struct SimulatedRemote<S> {
    store: Arc<S>,
    connected: AtomicBool,
    failing_ids: Mutex<HashSet<String>>,
    latency: Mutex<Option<Duration>>,
    metadata_calls: AtomicUsize,
    save_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl<S: LocalStore> SimulatedRemote<S> {
    /// Wraps a store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            connected: AtomicBool::new(true),
            failing_ids: Mutex::new(HashSet::new()),
            latency: Mutex::new(None),
            metadata_calls: AtomicUsize::new(0),
            save_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    /// Returns the backing store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Simulates connection loss or recovery.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Makes every save of `id` fail with [`RemoteError::Rejected`].
    pub fn fail_saves_for(&self, id: impl Into<String>) {
        self.failing_ids.lock().insert(id.into());
    }

    /// Clears injected save failures.
    pub fn clear_failures(&self) {
        self.failing_ids.lock().clear();
    }

    /// Delays every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Number of `get_metadata` calls.
    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    /// Number of `save` calls, failed ones included.
    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    /// Number of `fetch_updated_and_new` calls.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    async fn simulate(&self) -> RemoteResult<()> {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RemoteError::NotConnected)
        }
    }
}

fn backend_error(err: StoreError) -> RemoteError {
    RemoteError::transport_fatal(err.to_string())
}

#[async_trait]
impl<T, S> RemoteStore<T> for SimulatedRemote<S>
where
    T: SyncEntity,
    S: LocalStore + 'static,
{
    async fn get_metadata(&self, entity_name: &str) -> RemoteResult<Vec<Metadata>> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;
        if entity_name != T::ENTITY_NAME {
            return Err(RemoteError::transport_fatal(format!(
                "unknown entity type {entity_name}"
            )));
        }
        self.store.get_metadata::<T>().map_err(backend_error)
    }

    async fn save(&self, entity: &T, id: Option<&str>) -> RemoteResult<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;

        let stored = match id {
            Some(id) if id != entity.id() => entity.copy_with_new_id(id.to_string()),
            _ => entity.clone(),
        };
        if self.failing_ids.lock().contains(stored.id()) {
            return Err(RemoteError::Rejected {
                id: stored.id().to_string(),
                reason: "injected failure".to_string(),
            });
        }
        self.store.save(&stored).map_err(backend_error)
    }

    async fn fetch_updated_and_new(&self, local: &[Metadata]) -> RemoteResult<Vec<T>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;

        let all = self.store.get_all::<T>().map_err(backend_error)?;
        let local = MetadataIndex::from_metadata(local.iter().cloned());
        Ok(select_outgoing(&all, &local).into_iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftsync_model::Timestamp;
    use driftsync_store::InMemoryStore;
    use driftsync_testkit::Note;

    fn remote_with(notes: &[Note]) -> SimulatedRemote<InMemoryStore> {
        let store = InMemoryStore::new();
        for note in notes {
            store.save(note).unwrap();
        }
        SimulatedRemote::new(Arc::new(store))
    }

    #[tokio::test]
    async fn metadata_reflects_backing_store() {
        let remote = remote_with(&[Note::new("a", 10), Note::tombstone("b", 20)]);
        let metadata = RemoteStore::<Note>::get_metadata(&remote, "notes").await.unwrap();

        assert_eq!(
            metadata,
            vec![Metadata::new("a", 10), Metadata::tombstone("b", 20)]
        );
        assert_eq!(remote.metadata_calls(), 1);
    }

    #[tokio::test]
    async fn unknown_entity_name_is_rejected() {
        let remote = remote_with(&[]);
        let err = RemoteStore::<Note>::get_metadata(&remote, "photos")
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn fetch_returns_only_newer_and_new() {
        let remote = remote_with(&[Note::new("a", 10), Note::new("b", 5), Note::new("c", 1)]);
        let local = vec![Metadata::new("a", 8), Metadata::new("b", 5)];

        let fetched: Vec<Note> = remote.fetch_updated_and_new(&local).await.unwrap();
        let ids: Vec<_> = fetched.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn save_under_new_id_copies() {
        let remote = remote_with(&[]);
        remote.save(&Note::new("local-1", 10), Some("remote-1")).await.unwrap();

        let stored = remote.store().get::<Note>("remote-1").unwrap().unwrap();
        assert_eq!(stored.last_updated, Timestamp::from_millis(10));
        assert_eq!(remote.store().get::<Note>("local-1").unwrap(), None);
    }

    #[tokio::test]
    async fn injected_faults() {
        let remote = remote_with(&[]);
        remote.fail_saves_for("bad");

        let err = remote.save(&Note::new("bad", 1), None).await.unwrap_err();
        assert!(matches!(err, RemoteError::Rejected { .. }));
        remote.save(&Note::new("good", 1), None).await.unwrap();

        remote.set_connected(false);
        let err = remote.save(&Note::new("good", 2), None).await.unwrap_err();
        assert_eq!(err, RemoteError::NotConnected);
        assert_eq!(remote.save_calls(), 3);

        remote.set_connected(true);
        remote.clear_failures();
        remote.save(&Note::new("bad", 1), None).await.unwrap();
        assert_eq!(remote.store().count::<Note>().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn latency_delays_calls() {
        let remote = remote_with(&[]);
        remote.set_latency(Some(Duration::from_secs(2)));

        let start = tokio::time::Instant::now();
        let _: Vec<Note> = remote.fetch_updated_and_new(&[]).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
