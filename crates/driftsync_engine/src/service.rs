//! Configured sync handles, one per entity type.

use crate::config::{ConfigField, ConfigValidator, ServiceOptions, SyncConfig};
use crate::connectivity::Connectivity;
use crate::error::SyncResult;
use crate::pipeline::{build_pull_plan, build_push_plan, build_retention_plan, Plan, RunOutcome, SerialQueue};
use crate::prune::RetentionPolicy;
use crate::remote::RemoteStore;
use crate::scheduler::{
    ActiveCadence, BackgroundFuture, BackgroundHandler, BackgroundRequest, BackgroundScheduler,
    CadenceState, ExpirationSignal, TaskId, TaskPurpose, TickFn, TickFuture,
};
use driftsync_model::SyncEntity;
use driftsync_store::LocalStore;
use parking_lot::RwLock;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Statistics for one entity type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Runs that completed.
    pub runs_completed: u64,
    /// Runs stopped by cancellation.
    pub runs_cancelled: u64,
    /// Runs that failed.
    pub runs_failed: u64,
    /// Entities sent to the remote.
    pub entities_pushed: u64,
    /// Entities received from the remote.
    pub entities_pulled: u64,
    /// Entities removed by retention sweeps.
    pub entities_pruned: u64,
    /// Entity-level failures across all runs.
    pub entities_failed: u64,
    /// Error of the most recent failed run.
    pub last_error: Option<String>,
}

impl SyncStats {
    fn record(&mut self, purpose: TaskPurpose, outcome: &RunOutcome) {
        let report = match outcome {
            RunOutcome::Completed(report) => {
                self.runs_completed += 1;
                report
            }
            RunOutcome::Cancelled(report) => {
                self.runs_cancelled += 1;
                report
            }
            RunOutcome::Failed { stage, error } => {
                self.runs_failed += 1;
                self.last_error = Some(format!("{stage}: {error}"));
                return;
            }
        };

        let processed = report.processed as u64;
        match purpose {
            TaskPurpose::Push => self.entities_pushed += processed,
            TaskPurpose::Pull => self.entities_pulled += processed,
            TaskPurpose::Retention => self.entities_pruned += processed,
        }
        self.entities_failed += report.failed as u64;
    }
}

/// What [`SyncHandle::update_config`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigUpdate {
    /// Foreground timers re-armed or stopped.
    pub rearmed: Vec<TaskPurpose>,
    /// Background-only fields whose new values were ignored.
    pub ignored: Vec<ConfigField>,
}

/// Entry point: binds entity types to a local store and a background
/// scheduler.
///
/// # Example
///
/// ```rust,ignore
/// let service = SyncService::new(store, scheduler, ServiceOptions::default());
/// let notes = service.configure::<Note>(config, remote)?;
/// notes.register_background_tasks()?;
/// notes.schedule_background_tasks()?;
/// notes.enter_foreground();
/// ```
pub struct SyncService<S> {
    store: Arc<S>,
    background: Arc<dyn BackgroundScheduler>,
    options: ServiceOptions,
    connectivity: Option<Connectivity>,
}

impl<S: LocalStore + 'static> SyncService<S> {
    /// Creates a service.
    pub fn new(
        store: Arc<S>,
        background: Arc<dyn BackgroundScheduler>,
        options: ServiceOptions,
    ) -> Self {
        Self {
            store,
            background,
            options,
            connectivity: None,
        }
    }

    /// Skips timer ticks while `connectivity` reports offline.
    #[must_use]
    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    /// Returns the service options.
    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    /// Returns the local store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Validates `config` and returns the sync handle of entity type `T`.
    ///
    /// The handle starts in background mode with no timers armed and no
    /// background tasks registered. Background-only fields of `config` are
    /// fixed from here on.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::Config`] if `config` breaks a floor.
    pub fn configure<T: SyncEntity>(
        &self,
        config: SyncConfig,
        remote: Arc<dyn RemoteStore<T>>,
    ) -> SyncResult<SyncHandle<T, S>> {
        let validator = ConfigValidator::new(self.options.validation);
        let config = validator.validate(config)?;
        let entity = T::ENTITY_NAME;
        let policy = RetentionPolicy::from_config(&config);

        let inner = HandleInner {
            entity,
            namespace: self.options.namespace.clone(),
            remote_timeout: self.options.remote_timeout,
            validator,
            accepted: config.clone(),
            config: RwLock::new(config),
            push_plan: build_push_plan::<T, S>(Arc::clone(&self.store), Arc::clone(&remote)),
            pull_plan: build_pull_plan::<T, S>(Arc::clone(&self.store), remote),
            retention_plan: build_retention_plan::<T, S>(Arc::clone(&self.store), policy),
            push_queue: SerialQueue::new(format!("{entity}.push")),
            pull_queue: SerialQueue::new(format!("{entity}.pull")),
            retention_queue: SerialQueue::new(format!("{entity}.retention")),
            cadence: ActiveCadence::new(),
            background: Arc::clone(&self.background),
            connectivity: self.connectivity.clone(),
            foreground: AtomicBool::new(false),
            stats: RwLock::new(SyncStats::default()),
        };
        info!(entity, namespace = %inner.namespace, "entity type configured for sync");

        Ok(SyncHandle {
            inner: Arc::new(inner),
            store: Arc::clone(&self.store),
            _entity: PhantomData,
        })
    }
}

impl<S> fmt::Debug for SyncService<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncService")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

struct HandleInner {
    entity: &'static str,
    namespace: String,
    remote_timeout: Duration,
    validator: ConfigValidator,
    accepted: SyncConfig,
    config: RwLock<SyncConfig>,
    push_plan: Plan,
    pull_plan: Plan,
    retention_plan: Plan,
    push_queue: SerialQueue,
    pull_queue: SerialQueue,
    retention_queue: SerialQueue,
    cadence: ActiveCadence,
    background: Arc<dyn BackgroundScheduler>,
    connectivity: Option<Connectivity>,
    foreground: AtomicBool,
    stats: RwLock<SyncStats>,
}

impl HandleInner {
    fn plan(&self, purpose: TaskPurpose) -> &Plan {
        match purpose {
            TaskPurpose::Push => &self.push_plan,
            TaskPurpose::Pull => &self.pull_plan,
            TaskPurpose::Retention => &self.retention_plan,
        }
    }

    fn queue(&self, purpose: TaskPurpose) -> &SerialQueue {
        match purpose {
            TaskPurpose::Push => &self.push_queue,
            TaskPurpose::Pull => &self.pull_queue,
            TaskPurpose::Retention => &self.retention_queue,
        }
    }

    fn task_id(&self, purpose: TaskPurpose) -> TaskId {
        TaskId::derive(&self.namespace, self.entity, purpose)
    }

    fn is_online(&self) -> bool {
        self.connectivity
            .as_ref()
            .map_or(true, Connectivity::is_online)
    }

    fn background_interval(&self, purpose: TaskPurpose) -> Option<Duration> {
        match purpose {
            TaskPurpose::Push => self.accepted.push_background_interval,
            TaskPurpose::Pull => self.accepted.pull_background_interval,
            TaskPurpose::Retention => {
                if RetentionPolicy::from_config(&self.accepted).is_noop() {
                    None
                } else {
                    self.accepted.retention_sweep_interval
                }
            }
        }
    }

    async fn run(&self, purpose: TaskPurpose) -> RunOutcome {
        let token = self.queue(purpose).token();
        self.run_with_token(purpose, token).await
    }

    async fn run_with_token(
        &self,
        purpose: TaskPurpose,
        token: tokio_util::sync::CancellationToken,
    ) -> RunOutcome {
        let outcome = self
            .queue(purpose)
            .run_with_token(self.plan(purpose), self.remote_timeout, token)
            .await;
        self.stats.write().record(purpose, &outcome);
        outcome
    }

    fn submit_background(&self, purpose: TaskPurpose) -> SyncResult<()> {
        if let Some(interval) = self.background_interval(purpose) {
            let request = BackgroundRequest::after(self.task_id(purpose), SystemTime::now(), interval);
            self.background.submit(request)?;
        }
        Ok(())
    }

    fn arm(self: &Arc<Self>, purpose: TaskPurpose, interval: Option<Duration>) {
        let Some(interval) = interval else {
            self.cadence.disarm(purpose);
            return;
        };

        let weak = Arc::downgrade(self);
        let tick: TickFn = Arc::new(move || -> TickFuture {
            let weak = weak.clone();
            Box::pin(async move {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if !inner.is_online() {
                    debug!(entity = inner.entity, %purpose, "offline, skipping tick");
                    return;
                }
                inner.run(purpose).await;
            })
        });
        self.cadence.arm(purpose, interval, tick);
    }

    fn background_handler(self: &Arc<Self>, purpose: TaskPurpose) -> BackgroundHandler {
        let weak = Arc::downgrade(self);
        Arc::new(move |signal: ExpirationSignal| -> BackgroundFuture {
            let weak = weak.clone();
            Box::pin(async move {
                match weak.upgrade() {
                    Some(inner) => inner.handle_background(purpose, signal).await,
                    None => false,
                }
            })
        })
    }

    async fn handle_background(self: Arc<Self>, purpose: TaskPurpose, signal: ExpirationSignal) -> bool {
        let task_id = self.task_id(purpose);
        if let Err(err) = self.submit_background(purpose) {
            warn!(task_id = %task_id, error = %err, "failed to resubmit background request");
        }

        // Taken before the watcher starts so an early expiry still reaches it.
        let token = self.queue(purpose).token();
        let watcher = {
            let inner = Arc::clone(&self);
            let task_id = task_id.clone();
            tokio::spawn(async move {
                signal.expired().await;
                warn!(task_id = %task_id, "background window expired, cancelling queue");
                inner.queue(purpose).cancel_all();
            })
        };

        let outcome = self.run_with_token(purpose, token).await;
        watcher.abort();
        debug!(task_id = %task_id, success = outcome.is_success(), "background run finished");
        outcome.is_success()
    }
}

fn active_interval(config: &SyncConfig, purpose: TaskPurpose) -> Option<Duration> {
    match purpose {
        TaskPurpose::Push => config.push_active_interval,
        TaskPurpose::Pull => config.pull_active_interval,
        TaskPurpose::Retention => None,
    }
}

const ACTIVE_PURPOSES: [TaskPurpose; 2] = [TaskPurpose::Push, TaskPurpose::Pull];

/// Sync controls for one entity type.
///
/// Cloning is cheap; clones share queues, timers and statistics. Dropping
/// the last clone stops the foreground timers.
pub struct SyncHandle<T, S> {
    inner: Arc<HandleInner>,
    store: Arc<S>,
    _entity: PhantomData<fn() -> T>,
}

impl<T, S> Clone for SyncHandle<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            store: Arc::clone(&self.store),
            _entity: PhantomData,
        }
    }
}

impl<T, S> fmt::Debug for SyncHandle<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncHandle")
            .field("entity", &self.inner.entity)
            .field("config", &*self.inner.config.read())
            .finish_non_exhaustive()
    }
}

impl<T: SyncEntity, S: LocalStore + 'static> SyncHandle<T, S> {
    /// Entity type handled.
    pub fn entity_name(&self) -> &'static str {
        self.inner.entity
    }

    /// Returns the local store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Pulls remote changes now, queued behind any pull in progress.
    pub async fn sync_pull(&self) -> RunOutcome {
        self.inner.run(TaskPurpose::Pull).await
    }

    /// Pushes local changes now, queued behind any push in progress.
    pub async fn sync_push(&self) -> RunOutcome {
        self.inner.run(TaskPurpose::Push).await
    }

    /// Runs a retention sweep now.
    pub async fn prune_now(&self) -> RunOutcome {
        self.inner.run(TaskPurpose::Retention).await
    }

    /// Replaces the configuration.
    ///
    /// Foreground intervals take effect at once; timers whose interval
    /// changed are re-armed if the handle is in the foreground.
    /// Background-only fields keep the values accepted by `configure`; any
    /// attempt to change them is logged and reported in the result.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::Config`] if `config` breaks a floor; the
    /// previous configuration then stays in force.
    pub fn update_config(&self, config: SyncConfig) -> SyncResult<ConfigUpdate> {
        let inner = &self.inner;
        let mut config = inner.validator.validate(config)?;
        let mut update = ConfigUpdate::default();

        for field in ConfigField::ALL {
            if field.is_background_only() && config.differs(&inner.accepted, field) {
                warn!(
                    entity = inner.entity,
                    field = field.name(),
                    "background-only field cannot change after configure, keeping accepted value"
                );
                update.ignored.push(field);
            }
        }
        config.keep_background_fields(&inner.accepted);

        let previous = std::mem::replace(&mut *inner.config.write(), config.clone());
        if inner.foreground.load(Ordering::SeqCst) {
            for purpose in ACTIVE_PURPOSES {
                let interval = active_interval(&config, purpose);
                if interval != active_interval(&previous, purpose) {
                    inner.arm(purpose, interval);
                    update.rearmed.push(purpose);
                }
            }
        }

        info!(entity = inner.entity, rearmed = ?update.rearmed, "sync configuration updated");
        Ok(update)
    }

    /// Registers a background handler for every purpose with a background
    /// interval. Returns the registered task ids.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::Scheduler`] if the scheduler refuses.
    pub fn register_background_tasks(&self) -> SyncResult<Vec<TaskId>> {
        let mut registered = Vec::new();
        for purpose in TaskPurpose::ALL {
            if self.inner.background_interval(purpose).is_none() {
                continue;
            }
            let task_id = self.inner.task_id(purpose);
            self.inner
                .background
                .register(task_id.clone(), self.inner.background_handler(purpose))?;
            registered.push(task_id);
        }
        info!(entity = self.inner.entity, count = registered.len(), "background tasks registered");
        Ok(registered)
    }

    /// Submits the first background request for every registered purpose.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::Scheduler`] if a task is not registered.
    pub fn schedule_background_tasks(&self) -> SyncResult<Vec<TaskId>> {
        let mut scheduled = Vec::new();
        for purpose in TaskPurpose::ALL {
            if self.inner.background_interval(purpose).is_some() {
                self.inner.submit_background(purpose)?;
                scheduled.push(self.inner.task_id(purpose));
            }
        }
        Ok(scheduled)
    }

    /// Starts the foreground timers. Must be called inside a tokio runtime.
    pub fn enter_foreground(&self) {
        if self.inner.foreground.swap(true, Ordering::SeqCst) {
            return;
        }
        let config = self.inner.config.read().clone();
        for purpose in ACTIVE_PURPOSES {
            if let Some(interval) = active_interval(&config, purpose) {
                self.inner.arm(purpose, Some(interval));
            }
        }
        debug!(entity = self.inner.entity, "entered foreground");
    }

    /// Stops the foreground timers. Runs already started complete.
    pub fn enter_background(&self) {
        self.inner.foreground.store(false, Ordering::SeqCst);
        self.inner.cadence.disarm_all();
        debug!(entity = self.inner.entity, "entered background");
    }

    /// Returns true between `enter_foreground` and `enter_background`.
    pub fn is_foreground(&self) -> bool {
        self.inner.foreground.load(Ordering::SeqCst)
    }

    /// Cancels every running and queued run of this entity type.
    pub fn cancel_all(&self) {
        for purpose in TaskPurpose::ALL {
            self.inner.queue(purpose).cancel_all();
        }
    }

    /// Returns a snapshot of the statistics.
    pub fn stats(&self) -> SyncStats {
        self.inner.stats.read().clone()
    }

    /// Returns the configuration in force.
    pub fn config(&self) -> SyncConfig {
        self.inner.config.read().clone()
    }

    /// Returns the background task id of `purpose`.
    pub fn task_id(&self, purpose: TaskPurpose) -> TaskId {
        self.inner.task_id(purpose)
    }

    /// Returns the foreground timer state of `purpose`.
    pub fn cadence_state(&self, purpose: TaskPurpose) -> CadenceState {
        self.inner.cadence.state(purpose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationPolicy;
    use crate::error::{RemoteError, SyncError};
    use crate::remote::SimulatedRemote;
    use crate::scheduler::InProcessBackgroundScheduler;
    use crate::pipeline::RunReport;
    use driftsync_store::InMemoryStore;
    use driftsync_testkit::Note;

    fn service() -> SyncService<InMemoryStore> {
        SyncService::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InProcessBackgroundScheduler::new()),
            ServiceOptions::default(),
        )
    }

    fn remote() -> Arc<dyn RemoteStore<Note>> {
        Arc::new(SimulatedRemote::new(Arc::new(InMemoryStore::new())))
    }

    #[test]
    fn configure_rejects_floors() {
        let config = SyncConfig::new().with_push_active_interval(Duration::from_secs(3));
        let err = service().configure::<Note>(config, remote()).unwrap_err();
        match err {
            SyncError::Config(err) => assert_eq!(err.field_names(), vec!["push_active_interval"]),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn task_ids_use_namespace() {
        let service = SyncService::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InProcessBackgroundScheduler::new()),
            ServiceOptions::default().with_namespace("app"),
        );
        let handle = service.configure::<Note>(SyncConfig::new(), remote()).unwrap();
        assert_eq!(handle.task_id(TaskPurpose::Pull).as_str(), "app.notes.pull");
        assert_eq!(handle.entity_name(), "notes");
    }

    #[test]
    fn update_ignores_background_fields() {
        let config = SyncConfig::new()
            .with_push_active_interval(Duration::from_secs(10))
            .with_pull_background_interval(Duration::from_secs(3600));
        let handle = service().configure::<Note>(config, remote()).unwrap();

        let update = handle
            .update_config(
                SyncConfig::new()
                    .with_push_active_interval(Duration::from_secs(20))
                    .with_pull_background_interval(Duration::from_secs(7200))
                    .with_max_retained_count(10),
            )
            .unwrap();

        assert_eq!(
            update.ignored,
            vec![ConfigField::PullBackgroundInterval, ConfigField::MaxRetainedCount]
        );
        assert!(update.rearmed.is_empty());
        let current = handle.config();
        assert_eq!(current.push_active_interval, Some(Duration::from_secs(20)));
        assert_eq!(current.pull_background_interval, Some(Duration::from_secs(3600)));
        assert_eq!(current.max_retained_count, None);
    }

    #[test]
    fn rejected_update_keeps_previous_config() {
        let config = SyncConfig::new().with_push_active_interval(Duration::from_secs(10));
        let handle = service().configure::<Note>(config.clone(), remote()).unwrap();

        let err = handle
            .update_config(SyncConfig::new().with_push_active_interval(Duration::from_secs(1)))
            .unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
        assert_eq!(handle.config(), config);
    }

    #[tokio::test(start_paused = true)]
    async fn update_rearms_changed_timers_in_foreground() {
        let options = ServiceOptions::default().with_validation(ValidationPolicy::permissive());
        let service = SyncService::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InProcessBackgroundScheduler::new()),
            options,
        );
        let config = SyncConfig::new()
            .with_push_active_interval(Duration::from_secs(10))
            .with_pull_active_interval(Duration::from_secs(10));
        let handle = service.configure::<Note>(config, remote()).unwrap();
        handle.enter_foreground();

        let update = handle
            .update_config(SyncConfig::new().with_push_active_interval(Duration::from_secs(30)))
            .unwrap();
        assert_eq!(update.rearmed, vec![TaskPurpose::Push, TaskPurpose::Pull]);
        assert_eq!(
            handle.cadence_state(TaskPurpose::Push),
            CadenceState::Armed(Duration::from_secs(30))
        );
        assert_eq!(handle.cadence_state(TaskPurpose::Pull), CadenceState::Idle);

        handle.enter_background();
        assert_eq!(handle.cadence_state(TaskPurpose::Push), CadenceState::Idle);
        assert!(!handle.is_foreground());
    }

    #[test]
    fn registration_follows_background_intervals() {
        let scheduler = Arc::new(InProcessBackgroundScheduler::new());
        let service = SyncService::new(
            Arc::new(InMemoryStore::new()),
            Arc::clone(&scheduler) as Arc<dyn BackgroundScheduler>,
            ServiceOptions::default(),
        );
        let config = SyncConfig::new()
            .with_push_background_interval(Duration::from_secs(900))
            .with_retention_sweep_interval(Duration::from_secs(3600));
        let handle = service.configure::<Note>(config, remote()).unwrap();

        // No retention bound configured, so no retention task.
        let registered = handle.register_background_tasks().unwrap();
        assert_eq!(registered, vec![handle.task_id(TaskPurpose::Push)]);
        assert_eq!(scheduler.registered(), registered);
    }

    #[test]
    fn stats_record_outcomes() {
        let mut stats = SyncStats::default();
        let mut report = RunReport::new("notes", TaskPurpose::Push);
        report.processed = 3;
        report.failed = 1;
        stats.record(TaskPurpose::Push, &RunOutcome::Completed(report));
        stats.record(
            TaskPurpose::Pull,
            &RunOutcome::Failed {
                stage: "fetch_remote_entities_since",
                error: RemoteError::NotConnected.into(),
            },
        );

        assert_eq!(stats.runs_completed, 1);
        assert_eq!(stats.runs_failed, 1);
        assert_eq!(stats.entities_pushed, 3);
        assert_eq!(stats.entities_failed, 1);
        assert_eq!(
            stats.last_error.as_deref(),
            Some("fetch_remote_entities_since: remote error: not connected to remote")
        );
    }
}
