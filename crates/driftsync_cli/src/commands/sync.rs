//! Sync, prune and watch commands.

use super::Workspace;
use crate::note::Note;
use driftsync_engine::{RunOutcome, SyncHandle, SyncStats, TaskPurpose};
use driftsync_store::FileStore;
use std::time::Duration;
use tracing::info;

/// Runs one push.
pub async fn push(workspace: &Workspace) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = workspace.handle.sync_push().await;
    report("push", outcome)
}

/// Runs one pull.
pub async fn pull(workspace: &Workspace) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = workspace.handle.sync_pull().await;
    report("pull", outcome)
}

/// Runs one retention sweep.
pub async fn prune(workspace: &Workspace) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = workspace.handle.prune_now().await;
    report("prune", outcome)
}

/// Keeps the foreground timers armed for `seconds` or until Ctrl-C.
pub async fn watch(workspace: &Workspace, seconds: u64) -> Result<(), Box<dyn std::error::Error>> {
    let handle = &workspace.handle;
    let armed: Vec<TaskPurpose> = [TaskPurpose::Push, TaskPurpose::Pull]
        .into_iter()
        .filter(|purpose| active_interval(handle, *purpose).is_some())
        .collect();
    if armed.is_empty() {
        return Err("no active intervals configured, nothing to watch".into());
    }

    handle.enter_foreground();
    info!(?armed, seconds, "watching");
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }
    handle.enter_background();
    handle.cancel_all();

    print_stats(&handle.stats());
    println!("  Remote calls: {}", workspace.remote.metadata_calls());
    Ok(())
}

fn active_interval(handle: &SyncHandle<Note, FileStore>, purpose: TaskPurpose) -> Option<Duration> {
    let config = handle.config();
    match purpose {
        TaskPurpose::Push => config.push_active_interval,
        TaskPurpose::Pull => config.pull_active_interval,
        TaskPurpose::Retention => None,
    }
}

fn report(label: &str, outcome: RunOutcome) -> Result<(), Box<dyn std::error::Error>> {
    match outcome {
        RunOutcome::Completed(report) => {
            println!("✓ {label} completed");
            println!("  Processed: {}", report.processed);
            println!("  Skipped: {}", report.skipped);
            if report.failed > 0 {
                println!("  Failed: {}", report.failed);
            }
            Ok(())
        }
        RunOutcome::Cancelled(report) => {
            println!("✗ {label} cancelled");
            println!("  Processed: {}", report.processed);
            println!("  Untouched: {}", report.cancelled);
            Ok(())
        }
        RunOutcome::Failed { stage, error } => {
            Err(format!("{label} failed in {stage}: {error}").into())
        }
    }
}

fn print_stats(stats: &SyncStats) {
    println!("✓ Watch finished");
    println!(
        "  Runs: {} completed, {} cancelled, {} failed",
        stats.runs_completed, stats.runs_cancelled, stats.runs_failed
    );
    println!("  Pushed: {}", stats.entities_pushed);
    println!("  Pulled: {}", stats.entities_pulled);
    if let Some(error) = &stats.last_error {
        println!("  Last error: {error}");
    }
}
