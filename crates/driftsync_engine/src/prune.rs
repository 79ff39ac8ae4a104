//! Local retention sweep.

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::pipeline::{RunContext, RunReport, Stage};
use async_trait::async_trait;
use driftsync_model::{SyncEntity, Timestamp};
use driftsync_store::LocalStore;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Bounds applied by a retention sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Entities last updated longer ago than this are removed.
    pub max_age: Option<Duration>,
    /// At most this many entities are kept.
    pub max_count: Option<usize>,
}

impl RetentionPolicy {
    /// Extracts the retention bounds of a configuration.
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            max_age: config.retention_max_age,
            max_count: config.max_retained_count,
        }
    }

    /// Returns true if the policy never removes anything.
    pub fn is_noop(&self) -> bool {
        self.max_age.is_none() && self.max_count.is_none()
    }
}

/// What a sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Entities removed for exceeding the age bound.
    pub by_age: usize,
    /// Entities removed for exceeding the count bound.
    pub by_count: usize,
    /// The sweep stopped early.
    pub interrupted: bool,
}

impl PruneReport {
    /// Total number of removed entities.
    pub fn total(&self) -> usize {
        self.by_age + self.by_count
    }
}

/// Physically removes local entities of type `T` outside `policy`.
///
/// First every entity with `last_updated < now - max_age` goes, then, if more
/// than `max_count` remain, the oldest excess (ties broken by id). `cancel` is
/// consulted after each removal; a stopped sweep leaves a valid store.
///
/// # Errors
///
/// Returns an error if the store cannot be read or written.
pub fn prune<T, S, C>(
    store: &S,
    policy: &RetentionPolicy,
    now: Timestamp,
    cancel: C,
) -> SyncResult<PruneReport>
where
    T: SyncEntity,
    S: LocalStore,
    C: Fn() -> bool,
{
    let mut report = PruneReport::default();

    if let Some(max_age) = policy.max_age {
        let cutoff = now.saturating_sub(max_age);
        report.by_age =
            store.delete_where::<T, _, _>(|entity| entity.last_updated() < cutoff, &cancel)?;
        debug!(entity = T::ENTITY_NAME, removed = report.by_age, %cutoff, "age sweep done");
        if cancel() {
            report.interrupted = true;
            return Ok(report);
        }
    }

    if let Some(max_count) = policy.max_count {
        let mut metadata = store.get_metadata::<T>()?;
        if metadata.len() > max_count {
            metadata.sort_by(|a, b| {
                a.last_updated
                    .cmp(&b.last_updated)
                    .then_with(|| a.id.cmp(&b.id))
            });
            let excess = metadata.len() - max_count;
            for entry in metadata.iter().take(excess) {
                if store.purge::<T>(&entry.id)? {
                    report.by_count += 1;
                }
                if cancel() {
                    report.interrupted = true;
                    break;
                }
            }
        }
        debug!(entity = T::ENTITY_NAME, removed = report.by_count, max_count, "count sweep done");
    }

    Ok(report)
}

/// Terminal stage of the retention plan.
pub struct PruneRetained<T, S> {
    store: Arc<S>,
    policy: RetentionPolicy,
    _entity: PhantomData<fn() -> T>,
}

impl<T, S> PruneRetained<T, S> {
    /// Creates the stage.
    pub fn new(store: Arc<S>, policy: RetentionPolicy) -> Self {
        Self {
            store,
            policy,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<T: SyncEntity, S: LocalStore + 'static> Stage for PruneRetained<T, S> {
    type Input = ();
    type Output = RunReport;

    fn name(&self) -> &'static str {
        "prune_retained"
    }

    async fn run(&self, _input: (), ctx: &RunContext) -> SyncResult<RunReport> {
        let token = ctx.token().clone();
        let pruned = prune::<T, S, _>(&*self.store, &self.policy, Timestamp::now(), || {
            token.is_cancelled()
        })?;

        let mut report = RunReport::new(T::ENTITY_NAME, ctx.purpose());
        report.processed = pruned.total();
        report.interrupted = pruned.interrupted;
        if pruned.total() > 0 {
            info!(
                entity = T::ENTITY_NAME,
                by_age = pruned.by_age,
                by_count = pruned.by_count,
                "pruned local entities"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftsync_store::InMemoryStore;
    use driftsync_testkit::{seeded_store, Note};
    use proptest::prelude::*;
    use std::cell::Cell;

    fn ids(store: &InMemoryStore) -> Vec<String> {
        store
            .get_metadata::<Note>()
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect()
    }

    #[test]
    fn age_then_count() {
        let store = seeded_store(&[
            Note::new("a", 100),
            Note::new("b", 200),
            Note::new("c", 300),
            Note::new("d", 400),
            Note::new("e", 500),
        ]);
        let policy = RetentionPolicy {
            max_age: Some(Duration::from_millis(350)),
            max_count: Some(2),
        };

        let report = prune::<Note, _, _>(&*store, &policy, Timestamp::from_millis(600), || false)
            .unwrap();

        assert_eq!(report.by_age, 2);
        assert_eq!(report.by_count, 1);
        assert!(!report.interrupted);
        assert_eq!(ids(&store), vec!["d", "e"]);
    }

    #[test]
    fn count_ties_break_by_id() {
        let store = seeded_store(&[Note::new("b", 1), Note::new("a", 1), Note::new("c", 1)]);
        let policy = RetentionPolicy {
            max_age: None,
            max_count: Some(1),
        };

        prune::<Note, _, _>(&*store, &policy, Timestamp::from_millis(10), || false).unwrap();
        assert_eq!(ids(&store), vec!["c"]);
    }

    #[test]
    fn tombstones_count_towards_the_bound() {
        let store = seeded_store(&[Note::tombstone("a", 1), Note::new("b", 2)]);
        let policy = RetentionPolicy {
            max_age: None,
            max_count: Some(1),
        };

        let report =
            prune::<Note, _, _>(&*store, &policy, Timestamp::from_millis(10), || false).unwrap();
        assert_eq!(report.by_count, 1);
        assert_eq!(ids(&store), vec!["b"]);
    }

    #[test]
    fn noop_policy_removes_nothing() {
        let store = seeded_store(&[Note::new("a", 1)]);
        let policy = RetentionPolicy::default();
        assert!(policy.is_noop());

        let report =
            prune::<Note, _, _>(&*store, &policy, Timestamp::from_millis(10), || false).unwrap();
        assert_eq!(report, PruneReport::default());
        assert_eq!(ids(&store), vec!["a"]);
    }

    #[test]
    fn cancellation_stops_between_deletes() {
        let store = seeded_store(&[
            Note::new("a", 1),
            Note::new("b", 2),
            Note::new("c", 3),
            Note::new("d", 4),
        ]);
        let policy = RetentionPolicy {
            max_age: None,
            max_count: Some(0),
        };
        let checks = Cell::new(0);

        let report = prune::<Note, _, _>(&*store, &policy, Timestamp::from_millis(10), || {
            checks.set(checks.get() + 1);
            checks.get() >= 2
        })
        .unwrap();

        assert!(report.interrupted);
        assert_eq!(report.by_count, 2);
        assert_eq!(ids(&store), vec!["c", "d"]);
    }

    #[test]
    fn cancelled_age_sweep_skips_count_sweep() {
        let store = seeded_store(&[
            Note::new("a", 1),
            Note::new("b", 2),
            Note::new("c", 3),
            Note::new("d", 4),
            Note::new("e", 5),
        ]);
        let policy = RetentionPolicy {
            max_age: Some(Duration::from_millis(100)),
            max_count: Some(1),
        };
        let checks = Cell::new(0);

        let report = prune::<Note, _, _>(&*store, &policy, Timestamp::from_millis(500), || {
            checks.set(checks.get() + 1);
            // Pre-sweep check, then one per delete.
            checks.get() > 2
        })
        .unwrap();

        assert!(report.interrupted);
        assert_eq!(report.by_age, 2);
        assert_eq!(report.by_count, 0);
        assert_eq!(ids(&store), vec!["c", "d", "e"]);
    }

    #[test]
    fn policy_from_config() {
        let config = SyncConfig::new()
            .with_max_retained_count(50)
            .with_retention_max_age(Duration::from_secs(86_400));
        let policy = RetentionPolicy::from_config(&config);
        assert_eq!(policy.max_count, Some(50));
        assert_eq!(policy.max_age, Some(Duration::from_secs(86_400)));
    }

    proptest! {
        #[test]
        fn retention_bound_keeps_newest(
            stamps in proptest::collection::vec(0i64..50, 0..30),
            max_count in 0usize..20,
        ) {
            let notes: Vec<Note> = stamps
                .iter()
                .enumerate()
                .map(|(i, ts)| Note::new(&format!("n{i:02}"), *ts))
                .collect();
            let store = seeded_store(&notes);
            let policy = RetentionPolicy { max_age: None, max_count: Some(max_count) };

            prune::<Note, _, _>(&*store, &policy, Timestamp::from_millis(100), || false).unwrap();

            let mut expected: Vec<_> = notes
                .iter()
                .map(|n| (n.last_updated, n.id.clone()))
                .collect();
            expected.sort();
            let removed = expected.len().saturating_sub(max_count);
            let mut expected: Vec<String> = expected.into_iter().skip(removed).map(|(_, id)| id).collect();
            expected.sort();

            prop_assert!(store.count::<Note>().unwrap() <= max_count);
            prop_assert_eq!(ids(&store), expected);
        }
    }
}
