use serde::{Deserialize, Serialize};
use std::fmt;

/// What a scheduled run does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPurpose {
    /// Send local changes to the remote.
    Push,
    /// Bring remote changes into the local store.
    Pull,
    /// Remove old or excess local entities.
    Retention,
}

impl TaskPurpose {
    /// Every purpose.
    pub const ALL: [TaskPurpose; 3] = [TaskPurpose::Push, TaskPurpose::Pull, TaskPurpose::Retention];

    /// Returns the purpose as used in task identifiers.
    pub const fn as_str(self) -> &'static str {
        match self {
            TaskPurpose::Push => "push",
            TaskPurpose::Pull => "pull",
            TaskPurpose::Retention => "retention",
        }
    }
}

impl fmt::Display for TaskPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identifier of a background task slot.
///
/// Derived from namespace, entity name and purpose, so registering again
/// after a restart targets the same slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Derives the identifier `"{namespace}.{entity}.{purpose}"`.
    pub fn derive(namespace: &str, entity: &str, purpose: TaskPurpose) -> Self {
        Self(format!("{namespace}.{entity}.{purpose}"))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
