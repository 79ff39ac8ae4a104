use super::plan::{execute, Plan};
use super::report::RunOutcome;
use super::stage::RunContext;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Runs plans one at a time, in submission order.
///
/// Every run's token is a child of the queue's current generation, so
/// [`cancel_all`](Self::cancel_all) reaches the running plan and everything
/// already waiting. Later submissions start from a fresh generation.
#[derive(Debug)]
pub struct SerialQueue {
    name: String,
    lane: tokio::sync::Mutex<()>,
    generation: Mutex<CancellationToken>,
    waiting: AtomicUsize,
}

impl SerialQueue {
    /// Creates an idle queue.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lane: tokio::sync::Mutex::new(()),
            generation: Mutex::new(CancellationToken::new()),
            waiting: AtomicUsize::new(0),
        }
    }

    /// Queue name, used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a token tied to the current generation.
    pub fn token(&self) -> CancellationToken {
        self.generation.lock().child_token()
    }

    /// Runs `plan` once the lane is free.
    pub async fn run(&self, plan: &Plan, remote_timeout: Duration) -> RunOutcome {
        let token = self.token();
        self.run_with_token(plan, remote_timeout, token).await
    }

    /// Runs `plan` with a token obtained earlier from [`token`](Self::token).
    pub async fn run_with_token(
        &self,
        plan: &Plan,
        remote_timeout: Duration,
        token: CancellationToken,
    ) -> RunOutcome {
        self.waiting.fetch_add(1, Ordering::SeqCst);
        let _lane = self.lane.lock().await;
        self.waiting.fetch_sub(1, Ordering::SeqCst);

        debug!(queue = %self.name, "lane acquired");
        let ctx = RunContext::new(plan.entity(), plan.purpose(), token, remote_timeout);
        execute(plan, ctx).await
    }

    /// Cancels the running plan and every waiting one.
    pub fn cancel_all(&self) {
        let mut generation = self.generation.lock();
        generation.cancel();
        *generation = CancellationToken::new();
        debug!(queue = %self.name, "queue cancelled");
    }

    /// Returns true while a plan holds the lane.
    pub fn is_busy(&self) -> bool {
        self.lane.try_lock().is_err()
    }

    /// Number of runs waiting for the lane.
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::build_push_plan;
    use crate::remote::SimulatedRemote;
    use driftsync_store::InMemoryStore;
    use driftsync_testkit::{seeded_store, Note};
    use std::sync::Arc;

    fn slow_push_plan() -> (Plan, Arc<SimulatedRemote<InMemoryStore>>) {
        let local = seeded_store(&[Note::new("a", 1), Note::new("b", 1)]);
        let remote = Arc::new(SimulatedRemote::new(Arc::new(InMemoryStore::new())));
        remote.set_latency(Some(Duration::from_secs(1)));
        (build_push_plan::<Note, _>(local, remote.clone()), remote)
    }

    #[tokio::test(start_paused = true)]
    async fn runs_are_serialized() {
        let queue = Arc::new(SerialQueue::new("notes.push"));
        let (plan, remote) = slow_push_plan();
        let plan = Arc::new(plan);

        let first = {
            let (queue, plan) = (Arc::clone(&queue), Arc::clone(&plan));
            tokio::spawn(async move { queue.run(&plan, Duration::from_secs(30)).await })
        };
        while !queue.is_busy() {
            tokio::task::yield_now().await;
        }

        let second = {
            let (queue, plan) = (Arc::clone(&queue), Arc::clone(&plan));
            tokio::spawn(async move { queue.run(&plan, Duration::from_secs(30)).await })
        };
        while queue.waiting() < 1 {
            tokio::task::yield_now().await;
        }

        assert_eq!(first.await.unwrap().processed(), 2);
        // The second run sees the first run's stamps and has nothing to do.
        assert_eq!(second.await.unwrap().processed(), 0);
        assert_eq!(remote.save_calls(), 2);
        assert!(!queue.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_reaches_running_and_waiting_runs() {
        let queue = Arc::new(SerialQueue::new("notes.push"));
        let (plan, remote) = slow_push_plan();
        let plan = Arc::new(plan);

        let running = {
            let (queue, plan) = (Arc::clone(&queue), Arc::clone(&plan));
            tokio::spawn(async move { queue.run(&plan, Duration::from_secs(30)).await })
        };
        let waiting = {
            let (queue, plan) = (Arc::clone(&queue), Arc::clone(&plan));
            tokio::spawn(async move { queue.run(&plan, Duration::from_secs(30)).await })
        };
        while !queue.is_busy() || queue.waiting() < 1 {
            tokio::task::yield_now().await;
        }
        queue.cancel_all();

        let running = running.await.unwrap();
        let waiting = waiting.await.unwrap();
        assert!(running.is_cancelled());
        assert!(waiting.is_cancelled());
        // Only the in-flight metadata request reached the remote.
        assert_eq!(remote.metadata_calls(), 1);
        assert_eq!(remote.save_calls(), 0);

        let later = queue.run(&plan, Duration::from_secs(30)).await;
        assert!(later.is_success());
        assert_eq!(later.processed(), 2);
    }
}
