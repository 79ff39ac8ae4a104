use super::report::RunReport;
use super::stage::{RunContext, Stage};
use crate::error::SyncResult;
use crate::remote::RemoteStore;
use async_trait::async_trait;
use driftsync_model::{freshest_by_id, select_outgoing, Metadata, MetadataIndex, SyncEntity};
use driftsync_store::LocalStore;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

/// Reads the metadata of every local entity.
pub struct FetchLocalMetadata<T, S> {
    store: Arc<S>,
    _entity: PhantomData<fn() -> T>,
}

impl<T, S> FetchLocalMetadata<T, S> {
    /// Creates the stage.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<T: SyncEntity, S: LocalStore + 'static> Stage for FetchLocalMetadata<T, S> {
    type Input = ();
    type Output = Vec<Metadata>;

    fn name(&self) -> &'static str {
        "fetch_local_metadata"
    }

    async fn run(&self, _input: (), _ctx: &RunContext) -> SyncResult<Vec<Metadata>> {
        let metadata = self.store.get_metadata::<T>()?;
        debug!(entity = T::ENTITY_NAME, count = metadata.len(), "read local metadata");
        Ok(metadata)
    }
}

/// Remote entities fetched for a pull, with the local metadata they were
/// selected against.
#[derive(Debug)]
pub struct PulledBatch<T> {
    /// Local metadata at fetch time.
    pub local: MetadataIndex,
    /// Entities returned by the remote.
    pub incoming: Vec<T>,
}

/// Asks the remote for entities newer than, or missing from, the local side.
pub struct FetchRemoteEntitiesSince<T> {
    remote: Arc<dyn RemoteStore<T>>,
}

impl<T: SyncEntity> FetchRemoteEntitiesSince<T> {
    /// Creates the stage.
    pub fn new(remote: Arc<dyn RemoteStore<T>>) -> Self {
        Self { remote }
    }
}

#[async_trait]
impl<T: SyncEntity> Stage for FetchRemoteEntitiesSince<T> {
    type Input = Vec<Metadata>;
    type Output = PulledBatch<T>;

    fn name(&self) -> &'static str {
        "fetch_remote_entities_since"
    }

    async fn run(&self, local: Vec<Metadata>, ctx: &RunContext) -> SyncResult<PulledBatch<T>> {
        let incoming = ctx.remote(self.remote.fetch_updated_and_new(&local)).await?;
        debug!(entity = T::ENTITY_NAME, count = incoming.len(), "fetched remote entities");
        Ok(PulledBatch {
            local: MetadataIndex::from_metadata(local),
            incoming,
        })
    }
}

/// Writes pulled entities into the local store.
///
/// Each entity keeps the remote's `last_updated`, so both sides hold equal
/// timestamps afterwards. Incoming entities are filtered again through the
/// reconciliation rule; the remote may return more than needed, and a local
/// tombstone is never overwritten. An id returned more than once is written
/// once, with its freshest version.
pub struct PersistLocally<T, S> {
    store: Arc<S>,
    _entity: PhantomData<fn() -> T>,
}

impl<T, S> PersistLocally<T, S> {
    /// Creates the stage.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<T: SyncEntity, S: LocalStore + 'static> Stage for PersistLocally<T, S> {
    type Input = PulledBatch<T>;
    type Output = RunReport;

    fn name(&self) -> &'static str {
        "persist_locally"
    }

    async fn run(&self, batch: PulledBatch<T>, ctx: &RunContext) -> SyncResult<RunReport> {
        let mut report = RunReport::new(T::ENTITY_NAME, ctx.purpose());
        let received = batch.incoming.len();
        let incoming = freshest_by_id(batch.incoming);
        let selected = select_outgoing(&incoming, &batch.local);
        report.skipped = received - selected.len();

        for (index, entity) in selected.iter().enumerate() {
            if ctx.is_cancelled() {
                report.cancelled = selected.len() - index;
                report.interrupted = true;
                break;
            }
            match self.store.save(*entity) {
                Ok(()) => report.processed += 1,
                Err(err) => {
                    warn!(entity = T::ENTITY_NAME, id = entity.id(), error = %err, "failed to persist pulled entity");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}
