use super::task::TaskPurpose;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Lifecycle of one cadence slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CadenceState {
    /// No timer armed.
    Idle,
    /// Timer armed with the given interval.
    Armed(Duration),
    /// A triggered run is in progress.
    Firing,
}

/// Future of one triggered run.
pub type TickFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Work started by a timer tick.
pub type TickFn = Arc<dyn Fn() -> TickFuture + Send + Sync>;

#[derive(Debug)]
struct Slot {
    generation: u64,
    state: CadenceState,
    handle: Option<JoinHandle<()>>,
}

/// Repeating foreground timers, one per purpose.
///
/// Arming a purpose aborts its previous timer first. The first tick comes
/// one interval after arming; a tick waits for the previous run to finish.
/// Must be used inside a tokio runtime.
#[derive(Debug, Default)]
pub struct ActiveCadence {
    slots: Arc<Mutex<HashMap<TaskPurpose, Slot>>>,
}

impl ActiveCadence {
    /// Creates a cadence with every slot idle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the timer for `purpose`, replacing any existing one.
    ///
    /// A zero interval leaves the slot idle.
    pub fn arm(&self, purpose: TaskPurpose, interval: Duration, tick: TickFn) {
        let mut slots = self.slots.lock();
        let slot = slots.entry(purpose).or_insert(Slot {
            generation: 0,
            state: CadenceState::Idle,
            handle: None,
        });
        if let Some(handle) = slot.handle.take() {
            handle.abort();
        }
        slot.generation += 1;

        if interval.is_zero() {
            warn!(%purpose, "refusing to arm a zero interval");
            slot.state = CadenceState::Idle;
            return;
        }

        let generation = slot.generation;
        let shared = Arc::clone(&self.slots);
        slot.state = CadenceState::Armed(interval);
        slot.handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !set_state(&shared, purpose, generation, CadenceState::Firing) {
                    return;
                }
                debug!(%purpose, "cadence tick");
                // Spawned so aborting the timer never drops a run halfway.
                let run = tokio::spawn(tick());
                if let Err(err) = run.await {
                    warn!(%purpose, error = %err, "triggered run panicked");
                }
                if !set_state(&shared, purpose, generation, CadenceState::Armed(interval)) {
                    return;
                }
            }
        }));
        debug!(%purpose, ?interval, "cadence armed");
    }

    /// Stops the timer for `purpose`. A run already triggered completes.
    pub fn disarm(&self, purpose: TaskPurpose) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get_mut(&purpose) {
            if let Some(handle) = slot.handle.take() {
                handle.abort();
                debug!(%purpose, "cadence disarmed");
            }
            slot.generation += 1;
            slot.state = CadenceState::Idle;
        }
    }

    /// Stops every timer.
    pub fn disarm_all(&self) {
        for purpose in TaskPurpose::ALL {
            self.disarm(purpose);
        }
    }

    /// Returns the state of `purpose`.
    #[must_use]
    pub fn state(&self, purpose: TaskPurpose) -> CadenceState {
        self.slots
            .lock()
            .get(&purpose)
            .map_or(CadenceState::Idle, |slot| slot.state)
    }
}

impl Drop for ActiveCadence {
    fn drop(&mut self) {
        for slot in self.slots.lock().values_mut() {
            if let Some(handle) = slot.handle.take() {
                handle.abort();
            }
        }
    }
}

/// Updates a slot's state if it still belongs to `generation`.
fn set_state(
    slots: &Mutex<HashMap<TaskPurpose, Slot>>,
    purpose: TaskPurpose,
    generation: u64,
    state: CadenceState,
) -> bool {
    let mut slots = slots.lock();
    match slots.get_mut(&purpose) {
        Some(slot) if slot.generation == generation => {
            slot.state = state;
            true
        }
        _ => false,
    }
}
