//! # DriftSync Engine
//!
//! Offline-first synchronization between a client's local store and a
//! remote store.
//!
//! This crate provides:
//! - Typed stage pipelines for pull, push and retention runs
//! - Serial queues giving one run at a time per entity type and direction
//! - Foreground timers and background task plumbing
//! - Configuration validation against minimum-safety floors
//! - The retention pruner
//! - `SyncService`, the entry point that ties it together
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                SyncHandle<T, S>              │
//! │  ┌──────────────┐   ┌──────────────────────┐ │
//! │  │ActiveCadence │   │ BackgroundScheduler  │ │
//! │  └──────┬───────┘   └──────────┬───────────┘ │
//! │         ▼                      ▼             │
//! │  ┌────────────────────────────────────────┐  │
//! │  │   SerialQueue (push / pull / prune)    │  │
//! │  └───────────────────┬────────────────────┘  │
//! │                      ▼                       │
//! │  ┌────────────────────────────────────────┐  │
//! │  │         Plan: Stage ─▶ Stage ─▶ …      │  │
//! │  └───────┬─────────────────────┬──────────┘  │
//! └──────────┼─────────────────────┼─────────────┘
//!            ▼                     ▼
//!      LocalStore            RemoteStore<T>
//! ```
//!
//! ## Conflict handling
//!
//! Last write wins on `last_updated`, and a tombstone on the receiving side
//! always wins. See `driftsync_model::reconcile`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod connectivity;
mod error;
pub mod pipeline;
mod prune;
mod remote;
pub mod scheduler;
mod service;

pub use config::{
    ConfigField, ConfigValidator, ServiceOptions, SyncConfig, ValidationPolicy,
    ACTIVE_INTERVAL_FLOOR, BACKGROUND_INTERVAL_FLOOR, DEFAULT_NAMESPACE, DEFAULT_REMOTE_TIMEOUT,
    RETAINED_COUNT_FLOOR,
};
pub use connectivity::{Connectivity, ConnectivityMonitor};
pub use error::{ConfigError, RemoteError, RemoteResult, SchedulerError, SyncError, SyncResult};
pub use pipeline::{RunOutcome, RunReport};
pub use prune::{prune, PruneReport, PruneRetained, RetentionPolicy};
pub use remote::{RemoteStore, SimulatedRemote};
pub use scheduler::{
    BackgroundRequest, BackgroundScheduler, ExpirationSignal, InProcessBackgroundScheduler,
    TaskId, TaskPurpose,
};
pub use service::{ConfigUpdate, SyncHandle, SyncService, SyncStats};
