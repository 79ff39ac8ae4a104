//! Sync configuration and its validation.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Minimum interval for foreground timers.
pub const ACTIVE_INTERVAL_FLOOR: Duration = Duration::from_secs(5);

/// Minimum interval for background requests and the retention sweep.
pub const BACKGROUND_INTERVAL_FLOOR: Duration = Duration::from_secs(900);

/// Minimum value of `max_retained_count`.
pub const RETAINED_COUNT_FLOOR: usize = 5;

/// Default namespace for background task identifiers.
pub const DEFAULT_NAMESPACE: &str = "driftsync";

/// Default bound on a single remote call.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-entity-type sync configuration.
///
/// Every field is optional; an absent interval disables that cadence and an
/// absent retention bound disables that step of the pruner. Intervals are
/// written as whole seconds when serialized.
///
/// # Example
///
/// ```rust
/// use driftsync_engine::SyncConfig;
/// use std::time::Duration;
///
/// let config = SyncConfig::new()
///     .with_push_active_interval(Duration::from_secs(30))
///     .with_pull_background_interval(Duration::from_secs(3600))
///     .with_max_retained_count(500);
/// assert_eq!(config.max_retained_count, Some(500));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Foreground push timer interval.
    #[serde(with = "secs::option")]
    pub push_active_interval: Option<Duration>,
    /// Background push request interval.
    #[serde(with = "secs::option")]
    pub push_background_interval: Option<Duration>,
    /// Foreground pull timer interval.
    #[serde(with = "secs::option")]
    pub pull_active_interval: Option<Duration>,
    /// Background pull request interval.
    #[serde(with = "secs::option")]
    pub pull_background_interval: Option<Duration>,
    /// Background retention sweep interval.
    #[serde(with = "secs::option")]
    pub retention_sweep_interval: Option<Duration>,
    /// Maximum number of entities kept locally after a sweep.
    pub max_retained_count: Option<usize>,
    /// Maximum age of an entity's last update before a sweep removes it.
    #[serde(with = "secs::option")]
    pub retention_max_age: Option<Duration>,
}

impl SyncConfig {
    /// Creates an empty configuration with every cadence disabled.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            push_active_interval: None,
            push_background_interval: None,
            pull_active_interval: None,
            pull_background_interval: None,
            retention_sweep_interval: None,
            max_retained_count: None,
            retention_max_age: None,
        }
    }

    /// Sets the foreground push interval.
    #[must_use]
    pub const fn with_push_active_interval(mut self, interval: Duration) -> Self {
        self.push_active_interval = Some(interval);
        self
    }

    /// Sets the background push interval.
    #[must_use]
    pub const fn with_push_background_interval(mut self, interval: Duration) -> Self {
        self.push_background_interval = Some(interval);
        self
    }

    /// Sets the foreground pull interval.
    #[must_use]
    pub const fn with_pull_active_interval(mut self, interval: Duration) -> Self {
        self.pull_active_interval = Some(interval);
        self
    }

    /// Sets the background pull interval.
    #[must_use]
    pub const fn with_pull_background_interval(mut self, interval: Duration) -> Self {
        self.pull_background_interval = Some(interval);
        self
    }

    /// Sets the retention sweep interval.
    #[must_use]
    pub const fn with_retention_sweep_interval(mut self, interval: Duration) -> Self {
        self.retention_sweep_interval = Some(interval);
        self
    }

    /// Sets the maximum retained entity count.
    #[must_use]
    pub const fn with_max_retained_count(mut self, count: usize) -> Self {
        self.max_retained_count = Some(count);
        self
    }

    /// Sets the maximum entity age kept by the retention sweep.
    #[must_use]
    pub const fn with_retention_max_age(mut self, age: Duration) -> Self {
        self.retention_max_age = Some(age);
        self
    }

    /// Returns true if `field` differs between `self` and `other`.
    pub fn differs(&self, other: &Self, field: ConfigField) -> bool {
        match field {
            ConfigField::PushActiveInterval => {
                self.push_active_interval != other.push_active_interval
            }
            ConfigField::PushBackgroundInterval => {
                self.push_background_interval != other.push_background_interval
            }
            ConfigField::PullActiveInterval => {
                self.pull_active_interval != other.pull_active_interval
            }
            ConfigField::PullBackgroundInterval => {
                self.pull_background_interval != other.pull_background_interval
            }
            ConfigField::RetentionSweepInterval => {
                self.retention_sweep_interval != other.retention_sweep_interval
            }
            ConfigField::MaxRetainedCount => self.max_retained_count != other.max_retained_count,
            ConfigField::RetentionMaxAge => self.retention_max_age != other.retention_max_age,
        }
    }

    /// Copies every background-only field from `accepted` into `self`.
    pub(crate) fn keep_background_fields(&mut self, accepted: &Self) {
        self.push_background_interval = accepted.push_background_interval;
        self.pull_background_interval = accepted.pull_background_interval;
        self.retention_sweep_interval = accepted.retention_sweep_interval;
        self.max_retained_count = accepted.max_retained_count;
        self.retention_max_age = accepted.retention_max_age;
    }
}

/// Names a field of [`SyncConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigField {
    /// `push_active_interval`
    PushActiveInterval,
    /// `push_background_interval`
    PushBackgroundInterval,
    /// `pull_active_interval`
    PullActiveInterval,
    /// `pull_background_interval`
    PullBackgroundInterval,
    /// `retention_sweep_interval`
    RetentionSweepInterval,
    /// `max_retained_count`
    MaxRetainedCount,
    /// `retention_max_age`
    RetentionMaxAge,
}

impl ConfigField {
    /// Every field, in declaration order.
    pub const ALL: [ConfigField; 7] = [
        ConfigField::PushActiveInterval,
        ConfigField::PushBackgroundInterval,
        ConfigField::PullActiveInterval,
        ConfigField::PullBackgroundInterval,
        ConfigField::RetentionSweepInterval,
        ConfigField::MaxRetainedCount,
        ConfigField::RetentionMaxAge,
    ];

    /// Returns the field's name as written in configuration files.
    pub const fn name(self) -> &'static str {
        match self {
            ConfigField::PushActiveInterval => "push_active_interval",
            ConfigField::PushBackgroundInterval => "push_background_interval",
            ConfigField::PullActiveInterval => "pull_active_interval",
            ConfigField::PullBackgroundInterval => "pull_background_interval",
            ConfigField::RetentionSweepInterval => "retention_sweep_interval",
            ConfigField::MaxRetainedCount => "max_retained_count",
            ConfigField::RetentionMaxAge => "retention_max_age",
        }
    }

    /// Returns true for fields fixed once background tasks are registered.
    pub const fn is_background_only(self) -> bool {
        !matches!(
            self,
            ConfigField::PushActiveInterval | ConfigField::PullActiveInterval
        )
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Controls how strictly configurations are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    /// Reject values below the minimum-safety floors. Disable for tests.
    pub enforce_floors: bool,
}

impl ValidationPolicy {
    /// Floors enforced.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            enforce_floors: true,
        }
    }

    /// Every value accepted.
    #[must_use]
    pub const fn permissive() -> Self {
        Self {
            enforce_floors: false,
        }
    }
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::strict()
    }
}

/// Checks a [`SyncConfig`] against the minimum-safety floors.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigValidator {
    policy: ValidationPolicy,
}

impl ConfigValidator {
    /// Creates a validator with the given policy.
    #[must_use]
    pub const fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    /// Returns the validator's policy.
    #[must_use]
    pub const fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    /// Validates `config`, returning it unchanged on success.
    ///
    /// `retention_max_age` has no floor.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming every field below its floor.
    pub fn validate(&self, config: SyncConfig) -> Result<SyncConfig, ConfigError> {
        if !self.policy.enforce_floors {
            return Ok(config);
        }

        let mut fields = Vec::new();
        let intervals = [
            (
                ConfigField::PushActiveInterval,
                config.push_active_interval,
                ACTIVE_INTERVAL_FLOOR,
            ),
            (
                ConfigField::PushBackgroundInterval,
                config.push_background_interval,
                BACKGROUND_INTERVAL_FLOOR,
            ),
            (
                ConfigField::PullActiveInterval,
                config.pull_active_interval,
                ACTIVE_INTERVAL_FLOOR,
            ),
            (
                ConfigField::PullBackgroundInterval,
                config.pull_background_interval,
                BACKGROUND_INTERVAL_FLOOR,
            ),
            (
                ConfigField::RetentionSweepInterval,
                config.retention_sweep_interval,
                BACKGROUND_INTERVAL_FLOOR,
            ),
        ];
        for (field, value, floor) in intervals {
            if value.is_some_and(|interval| interval < floor) {
                fields.push(field);
            }
        }
        if config
            .max_retained_count
            .is_some_and(|count| count < RETAINED_COUNT_FLOOR)
        {
            fields.push(ConfigField::MaxRetainedCount);
        }

        if fields.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError { fields })
        }
    }
}

/// Options shared by every entity type configured on one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceOptions {
    /// Prefix of every background task identifier.
    pub namespace: String,
    /// Bound on each remote call, in whole seconds when serialized.
    #[serde(with = "secs::required")]
    pub remote_timeout: Duration,
    /// Validation policy applied by `configure` and `update_config`.
    pub validation: ValidationPolicy,
}

impl ServiceOptions {
    /// Sets the task id namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the remote call timeout.
    #[must_use]
    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    /// Sets the validation policy.
    #[must_use]
    pub fn with_validation(mut self, validation: ValidationPolicy) -> Self {
        self.validation = validation;
        self
    }
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            validation: ValidationPolicy::default(),
        }
    }
}

mod secs {
    pub mod option {
        use serde::{Deserialize, Deserializer, Serialize, Serializer};
        use std::time::Duration;

        pub fn serialize<S: Serializer>(
            value: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            value.map(|d| d.as_secs()).serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
        }
    }

    pub mod required {
        use serde::{Deserialize, Deserializer, Serialize, Serializer};
        use std::time::Duration;

        pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
            value.as_secs().serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
            Ok(Duration::from_secs(u64::deserialize(deserializer)?))
        }
    }
}
