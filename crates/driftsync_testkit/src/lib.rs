//! # DriftSync Testkit
//!
//! Test utilities for DriftSync.
//!
//! This crate provides:
//! - `Note`, a small entity type implementing every sync capability
//! - Fixtures for seeded in-memory and temporary file stores
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use driftsync_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_store() {
//!     let store = seeded_store(&[Note::new("a", 10), Note::tombstone("b", 20)]);
//!     // ... test operations
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod entity;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::entity::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use entity::*;
pub use fixtures::*;
pub use generators::*;
