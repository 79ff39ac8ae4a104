use crate::error::SyncError;
use crate::scheduler::TaskPurpose;

/// Counters produced by the terminal stage of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Entity type of the run.
    pub entity: &'static str,
    /// Purpose of the run.
    pub purpose: TaskPurpose,
    /// Entities transferred or removed.
    pub processed: usize,
    /// Entities whose transfer failed; they are retried next run.
    pub failed: usize,
    /// Entities examined that needed no work.
    pub skipped: usize,
    /// Entities left untouched because the run was cancelled.
    pub cancelled: usize,
    /// The terminal stage stopped early on cancellation.
    pub interrupted: bool,
}

impl RunReport {
    /// Creates an empty report.
    pub fn new(entity: &'static str, purpose: TaskPurpose) -> Self {
        Self {
            entity,
            purpose,
            processed: 0,
            failed: 0,
            skipped: 0,
            cancelled: 0,
            interrupted: false,
        }
    }
}

/// Result of one pipeline run.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every stage ran to the end.
    Completed(RunReport),
    /// The run stopped early; work already applied stays applied.
    Cancelled(RunReport),
    /// A stage failed.
    Failed {
        /// Name of the failing stage.
        stage: &'static str,
        /// The error.
        error: SyncError,
    },
}

impl RunOutcome {
    /// True iff the terminal stage completed without cancellation.
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }

    /// True if the run was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunOutcome::Cancelled(_))
    }

    /// The run's report, unless it failed.
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            RunOutcome::Completed(report) | RunOutcome::Cancelled(report) => Some(report),
            RunOutcome::Failed { .. } => None,
        }
    }

    /// The error of a failed run.
    pub fn error(&self) -> Option<&SyncError> {
        match self {
            RunOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Entities processed by the run.
    pub fn processed(&self) -> usize {
        self.report().map_or(0, |report| report.processed)
    }
}
