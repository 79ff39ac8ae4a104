use super::report::RunReport;
use super::stage::{RunContext, Stage};
use crate::error::SyncResult;
use crate::remote::RemoteStore;
use async_trait::async_trait;
use driftsync_model::{select_outgoing, MetadataIndex, SyncEntity, Timestamp};
use driftsync_store::LocalStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Reads the remote's metadata for the entity type.
pub struct FetchRemoteMetadata<T> {
    remote: Arc<dyn RemoteStore<T>>,
}

impl<T: SyncEntity> FetchRemoteMetadata<T> {
    /// Creates the stage.
    pub fn new(remote: Arc<dyn RemoteStore<T>>) -> Self {
        Self { remote }
    }
}

#[async_trait]
impl<T: SyncEntity> Stage for FetchRemoteMetadata<T> {
    type Input = ();
    type Output = MetadataIndex;

    fn name(&self) -> &'static str {
        "fetch_remote_metadata"
    }

    async fn run(&self, _input: (), ctx: &RunContext) -> SyncResult<MetadataIndex> {
        let metadata = ctx
            .remote(self.remote.get_metadata(T::ENTITY_NAME))
            .await?;
        debug!(entity = T::ENTITY_NAME, count = metadata.len(), "read remote metadata");
        Ok(MetadataIndex::from_metadata(metadata))
    }
}

/// Sends every local entity the remote lacks or holds an older version of.
///
/// Each entity goes out with `last_updated` set to the current time; once the
/// remote acknowledges it, the local copy is stamped with that same time,
/// unless the local copy was rewritten in the meantime.
/// The cancellation token is checked between entities.
pub struct ComputeAndPushLocalEntities<T, S> {
    store: Arc<S>,
    remote: Arc<dyn RemoteStore<T>>,
}

impl<T: SyncEntity, S> ComputeAndPushLocalEntities<T, S> {
    /// Creates the stage.
    pub fn new(store: Arc<S>, remote: Arc<dyn RemoteStore<T>>) -> Self {
        Self { store, remote }
    }
}

#[async_trait]
impl<T: SyncEntity, S: LocalStore + 'static> Stage for ComputeAndPushLocalEntities<T, S> {
    type Input = MetadataIndex;
    type Output = RunReport;

    fn name(&self) -> &'static str {
        "compute_and_push_local_entities"
    }

    async fn run(&self, remote: MetadataIndex, ctx: &RunContext) -> SyncResult<RunReport> {
        let mut report = RunReport::new(T::ENTITY_NAME, ctx.purpose());
        let local = self.store.get_all::<T>()?;
        let outgoing = select_outgoing(&local, &remote);
        report.skipped = local.len() - outgoing.len();
        debug!(entity = T::ENTITY_NAME, count = outgoing.len(), "entities to push");

        for (index, entity) in outgoing.iter().enumerate() {
            if ctx.is_cancelled() {
                report.cancelled = outgoing.len() - index;
                report.interrupted = true;
                break;
            }

            let stamp = Timestamp::now().max(entity.last_updated());
            let mut sent = (*entity).clone();
            sent.set_last_updated(stamp);

            if let Err(err) = ctx.remote(self.remote.save(&sent, None)).await {
                warn!(entity = T::ENTITY_NAME, id = entity.id(), error = %err, "failed to push entity");
                report.failed += 1;
                continue;
            }

            match self
                .store
                .stamp_updated_if::<T>(entity.id(), entity.last_updated(), stamp)
            {
                Ok(true) => report.processed += 1,
                Ok(false) => {
                    // Edited locally while in flight; the edit goes out next run.
                    debug!(entity = T::ENTITY_NAME, id = entity.id(), "local copy changed during push, left unstamped");
                    report.processed += 1;
                }
                Err(err) => {
                    // The remote holds the newer copy; the next pull restores it.
                    warn!(entity = T::ENTITY_NAME, id = entity.id(), error = %err, "pushed entity but failed to stamp local copy");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}
