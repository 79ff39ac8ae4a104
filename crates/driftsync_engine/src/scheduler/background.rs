use super::task::TaskId;
use crate::error::SchedulerError;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A request to run a registered task no earlier than `earliest_begin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundRequest {
    /// Target task slot.
    pub task_id: TaskId,
    /// Earliest time the platform may fire the task.
    pub earliest_begin: SystemTime,
}

impl BackgroundRequest {
    /// Creates a request that may fire `delay` after `now`.
    pub fn after(task_id: TaskId, now: SystemTime, delay: Duration) -> Self {
        Self {
            task_id,
            earliest_begin: now + delay,
        }
    }
}

/// Raised by the platform when a background window is about to close.
#[derive(Debug, Clone, Default)]
pub struct ExpirationSignal {
    token: CancellationToken,
}

impl ExpirationSignal {
    /// Creates a signal that has not expired.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the window as expired.
    pub fn expire(&self) {
        self.token.cancel();
    }

    /// Returns true once the window has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when the window expires.
    pub async fn expired(&self) {
        self.token.cancelled().await;
    }
}

/// Future returned by a background handler; resolves to the run's success.
pub type BackgroundFuture = Pin<Box<dyn Future<Output = bool> + Send>>;

/// Work invoked when a background task fires.
pub type BackgroundHandler = Arc<dyn Fn(ExpirationSignal) -> BackgroundFuture + Send + Sync>;

/// The platform facility that runs registered work in background windows.
///
/// Only submission is guaranteed; the platform decides if and when a
/// submitted request fires.
pub trait BackgroundScheduler: Send + Sync {
    /// Registers the handler for `task_id`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform refuses the registration.
    fn register(&self, task_id: TaskId, handler: BackgroundHandler) -> Result<(), SchedulerError>;

    /// Submits a request, replacing any pending request for the same task.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::NotRegistered`] if no handler is registered.
    fn submit(&self, request: BackgroundRequest) -> Result<(), SchedulerError>;

    /// Withdraws the pending request for `task_id`, if any.
    fn cancel(&self, task_id: &TaskId);
}

/// A background task started by [`InProcessBackgroundScheduler::fire`].
pub struct FiredTask {
    /// The fired task slot.
    pub task_id: TaskId,
    /// Expire this to close the window.
    pub signal: ExpirationSignal,
    /// Resolves to the handler's result.
    pub handle: JoinHandle<bool>,
}

impl fmt::Debug for FiredTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FiredTask")
            .field("task_id", &self.task_id)
            .field("expired", &self.signal.is_expired())
            .finish()
    }
}

/// A [`BackgroundScheduler`] that runs handlers on the current tokio runtime.
///
/// Nothing fires on its own: the host (or a test) calls [`fire`](Self::fire)
/// or [`fire_due`](Self::fire_due) to open a window.
#[derive(Default)]
pub struct InProcessBackgroundScheduler {
    handlers: Mutex<HashMap<TaskId, BackgroundHandler>>,
    pending: Mutex<BTreeMap<TaskId, BackgroundRequest>>,
    submissions: AtomicUsize,
}

impl InProcessBackgroundScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a handler is registered for `task_id`.
    #[must_use]
    pub fn is_registered(&self, task_id: &TaskId) -> bool {
        self.handlers.lock().contains_key(task_id)
    }

    /// Returns the registered task ids, sorted.
    #[must_use]
    pub fn registered(&self) -> Vec<TaskId> {
        let mut ids: Vec<_> = self.handlers.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Returns the pending request for `task_id`.
    #[must_use]
    pub fn pending_request(&self, task_id: &TaskId) -> Option<BackgroundRequest> {
        self.pending.lock().get(task_id).cloned()
    }

    /// Returns every pending request, ordered by task id.
    #[must_use]
    pub fn pending(&self) -> Vec<BackgroundRequest> {
        self.pending.lock().values().cloned().collect()
    }

    /// Total number of accepted submissions.
    #[must_use]
    pub fn submission_count(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Opens a background window for `task_id`.
    ///
    /// Consumes the pending request and spawns the handler. Returns `None`
    /// if nothing is pending or no handler is registered.
    pub fn fire(&self, task_id: &TaskId) -> Option<FiredTask> {
        let handler = self.handlers.lock().get(task_id).cloned()?;
        self.pending.lock().remove(task_id)?;

        let signal = ExpirationSignal::new();
        debug!(task_id = %task_id, "background task fired");
        let handle = tokio::spawn(handler(signal.clone()));
        Some(FiredTask {
            task_id: task_id.clone(),
            signal,
            handle,
        })
    }

    /// Fires every pending request whose earliest begin is at or before `now`.
    pub fn fire_due(&self, now: SystemTime) -> Vec<FiredTask> {
        let due: Vec<TaskId> = self
            .pending
            .lock()
            .values()
            .filter(|request| request.earliest_begin <= now)
            .map(|request| request.task_id.clone())
            .collect();
        due.iter().filter_map(|task_id| self.fire(task_id)).collect()
    }
}

impl fmt::Debug for InProcessBackgroundScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InProcessBackgroundScheduler")
            .field("registered", &self.registered())
            .field("pending", &self.pending())
            .finish()
    }
}

impl BackgroundScheduler for InProcessBackgroundScheduler {
    fn register(&self, task_id: TaskId, handler: BackgroundHandler) -> Result<(), SchedulerError> {
        debug!(task_id = %task_id, "background task registered");
        self.handlers.lock().insert(task_id, handler);
        Ok(())
    }

    fn submit(&self, request: BackgroundRequest) -> Result<(), SchedulerError> {
        if !self.is_registered(&request.task_id) {
            return Err(SchedulerError::NotRegistered(request.task_id));
        }
        debug!(task_id = %request.task_id, "background request submitted");
        self.pending.lock().insert(request.task_id.clone(), request);
        self.submissions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn cancel(&self, task_id: &TaskId) {
        self.pending.lock().remove(task_id);
    }
}
