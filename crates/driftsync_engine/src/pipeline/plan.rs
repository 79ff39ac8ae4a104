use super::pull::{FetchLocalMetadata, FetchRemoteEntitiesSince, PersistLocally};
use super::push::{ComputeAndPushLocalEntities, FetchRemoteMetadata};
use super::report::{RunOutcome, RunReport};
use super::stage::{Bridge, RunContext, Stage, StageExt};
use crate::error::SyncError;
use crate::prune::{PruneRetained, RetentionPolicy};
use crate::remote::RemoteStore;
use crate::scheduler::TaskPurpose;
use driftsync_model::{Metadata, SyncEntity};
use driftsync_store::LocalStore;
use std::fmt;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

type RootStage = Box<dyn Stage<Input = (), Output = RunReport>>;

/// A ready-to-run chain of stages for one entity type and purpose.
///
/// Plans hold no per-run state and can be executed any number of times.
pub struct Plan {
    entity: &'static str,
    purpose: TaskPurpose,
    stages: Vec<&'static str>,
    root: RootStage,
}

impl Plan {
    /// Wraps a stage chain that starts from `()` and ends in a report.
    pub fn new<S>(entity: &'static str, purpose: TaskPurpose, root: S) -> Self
    where
        S: Stage<Input = (), Output = RunReport> + 'static,
    {
        Self {
            entity,
            purpose,
            stages: root.stage_names(),
            root: Box::new(root),
        }
    }

    /// Entity type of the plan.
    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Purpose of the plan.
    pub fn purpose(&self) -> TaskPurpose {
        self.purpose
    }

    /// Leaf stage names in execution order.
    pub fn stage_names(&self) -> &[&'static str] {
        &self.stages
    }
}

impl fmt::Debug for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan")
            .field("entity", &self.entity)
            .field("purpose", &self.purpose)
            .field("stages", &self.stages)
            .finish()
    }
}

/// `FetchLocalMetadata → bridge → FetchRemoteEntitiesSince → bridge → PersistLocally`
pub fn build_pull_plan<T, S>(store: Arc<S>, remote: Arc<dyn RemoteStore<T>>) -> Plan
where
    T: SyncEntity,
    S: LocalStore + 'static,
{
    let chain = FetchLocalMetadata::<T, S>::new(Arc::clone(&store))
        .then(Bridge::<Vec<Metadata>>::new())
        .then(FetchRemoteEntitiesSince::new(remote))
        .then(Bridge::new())
        .then(PersistLocally::<T, S>::new(store));
    Plan::new(T::ENTITY_NAME, TaskPurpose::Pull, chain)
}

/// `FetchRemoteMetadata → bridge → ComputeAndPushLocalEntities`
pub fn build_push_plan<T, S>(store: Arc<S>, remote: Arc<dyn RemoteStore<T>>) -> Plan
where
    T: SyncEntity,
    S: LocalStore + 'static,
{
    let chain = FetchRemoteMetadata::new(Arc::clone(&remote))
        .then(Bridge::new())
        .then(ComputeAndPushLocalEntities::new(store, remote));
    Plan::new(T::ENTITY_NAME, TaskPurpose::Push, chain)
}

/// `PruneRetained`
pub fn build_retention_plan<T, S>(store: Arc<S>, policy: RetentionPolicy) -> Plan
where
    T: SyncEntity,
    S: LocalStore + 'static,
{
    Plan::new(
        T::ENTITY_NAME,
        TaskPurpose::Retention,
        PruneRetained::<T, S>::new(store, policy),
    )
}

/// Runs `plan` to completion, cancellation or failure.
pub async fn execute(plan: &Plan, ctx: RunContext) -> RunOutcome {
    let span = info_span!("sync_run", entity = plan.entity, purpose = %plan.purpose);
    async move {
        let first = plan.stages.first().copied().unwrap_or("start");
        let result = match ctx.enter(first) {
            Ok(()) => plan.root.run((), &ctx).await,
            Err(err) => Err(err),
        };

        let outcome = match result {
            Ok(report) if report.interrupted => RunOutcome::Cancelled(report),
            Ok(report) => RunOutcome::Completed(report),
            Err(SyncError::Cancelled { stage }) => {
                info!(stage, "run cancelled before stage");
                RunOutcome::Cancelled(RunReport {
                    interrupted: true,
                    ..RunReport::new(plan.entity, plan.purpose)
                })
            }
            Err(error) => RunOutcome::Failed {
                stage: ctx.current_stage(),
                error,
            },
        };

        match &outcome {
            RunOutcome::Completed(report) => info!(
                processed = report.processed,
                failed = report.failed,
                skipped = report.skipped,
                "run completed"
            ),
            RunOutcome::Cancelled(report) => info!(
                processed = report.processed,
                untouched = report.cancelled,
                "run cancelled"
            ),
            RunOutcome::Failed { stage, error } => warn!(stage, error = %error, "run failed"),
        }
        outcome
    }
    .instrument(span)
    .await
}
