//! Timers and background task plumbing.
//!
//! Each entity type has three cadence slots, one per [`TaskPurpose`]:
//!
//! ```text
//! Idle ──arm──▶ Armed(interval) ──tick──▶ Firing ──run done──▶ Armed
//!   ▲                 │                                          │
//!   └──── disarm ─────┴──────────────────── disarm ──────────────┘
//! ```
//!
//! Foreground timers live in [`ActiveCadence`]. Background work goes
//! through a [`BackgroundScheduler`], which only guarantees submission.

mod background;
mod cadence;
mod task;

pub use background::{
    BackgroundFuture, BackgroundHandler, BackgroundRequest, BackgroundScheduler, ExpirationSignal,
    FiredTask, InProcessBackgroundScheduler,
};
pub use cadence::{ActiveCadence, CadenceState, TickFn, TickFuture};
pub use task::{TaskId, TaskPurpose};
