//! Settings validation commands.

use crate::note::Note;
use crate::settings::Settings;
use driftsync_engine::{ConfigValidator, SyncConfig, TaskId, TaskPurpose};
use driftsync_model::SyncEntity;
use serde::Serialize;

/// Validation result.
#[derive(Debug, Serialize)]
pub struct ValidationResult {
    /// Whether every field passed.
    pub valid: bool,
    /// Names of fields below their floor.
    pub below_floor: Vec<&'static str>,
}

/// Checks the sync section of the settings against the floors.
pub fn validate(settings: &Settings, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let validator = ConfigValidator::new(settings.service.validation);
    let result = match validator.validate(settings.sync.clone()) {
        Ok(_) => ValidationResult {
            valid: true,
            below_floor: Vec::new(),
        },
        Err(err) => ValidationResult {
            valid: false,
            below_floor: err.field_names(),
        },
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => {
            if result.valid {
                println!("✓ Settings are valid");
            } else {
                println!("✗ Settings are invalid");
                for field in &result.below_floor {
                    println!("  below minimum: {field}");
                }
            }
        }
    }

    if result.valid {
        Ok(())
    } else {
        Err("settings validation failed".into())
    }
}

/// Prints the task ids a handle would register for background work.
pub fn task_ids(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let ids = background_task_ids(&settings.service.namespace, &settings.sync);
    if ids.is_empty() {
        println!("No background intervals configured");
    }
    for id in ids {
        println!("{id}");
    }
    Ok(())
}

fn background_task_ids(namespace: &str, config: &SyncConfig) -> Vec<TaskId> {
    let has_retention_bound =
        config.max_retained_count.is_some() || config.retention_max_age.is_some();
    TaskPurpose::ALL
        .into_iter()
        .filter(|purpose| match purpose {
            TaskPurpose::Push => config.push_background_interval.is_some(),
            TaskPurpose::Pull => config.pull_background_interval.is_some(),
            TaskPurpose::Retention => {
                config.retention_sweep_interval.is_some() && has_retention_bound
            }
        })
        .map(|purpose| TaskId::derive(namespace, Note::ENTITY_NAME, purpose))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn task_ids_follow_background_intervals() {
        let config = SyncConfig::new()
            .with_pull_background_interval(Duration::from_secs(900))
            .with_retention_sweep_interval(Duration::from_secs(900));
        let ids = background_task_ids("app", &config);
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].as_str(), "app.notes.pull");

        let config = config.with_max_retained_count(10);
        let ids: Vec<String> = background_task_ids("app", &config)
            .iter()
            .map(|id| id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["app.notes.pull", "app.notes.retention"]);
    }
}
