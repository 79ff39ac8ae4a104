//! Typed stage pipelines for pull, push and retention runs.
//!
//! ```text
//! pull:      fetch_local_metadata ─▶ bridge ─▶ fetch_remote_entities_since ─▶ bridge ─▶ persist_locally
//! push:      fetch_remote_metadata ─▶ bridge ─▶ compute_and_push_local_entities
//! retention: prune_retained
//! ```
//!
//! Each stage receives its predecessor's output by value. The run's
//! cancellation token is checked before every stage and between entities.

mod plan;
mod pull;
mod push;
mod queue;
mod report;
mod stage;

pub use plan::{build_pull_plan, build_push_plan, build_retention_plan, execute, Plan};
pub use pull::{FetchLocalMetadata, FetchRemoteEntitiesSince, PersistLocally, PulledBatch};
pub use push::{ComputeAndPushLocalEntities, FetchRemoteMetadata};
pub use queue::SerialQueue;
pub use report::{RunOutcome, RunReport};
pub use stage::{Bridge, Chain, RunContext, Stage, StageExt};
