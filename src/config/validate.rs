// src/config/validate.rs

use crate::config::model::{Manifest, RawManifest};
use crate::errors::{DynadagError, Result};

impl TryFrom<RawManifest> for Manifest {
    type Error = DynadagError;

    fn try_from(raw: RawManifest) -> std::result::Result<Self, Self::Error> {
        validate_raw_manifest(&raw)?;
        Ok(Manifest::new_unchecked(raw.engine, raw.task))
    }
}

fn validate_raw_manifest(raw: &RawManifest) -> Result<()> {
    ensure_has_tasks(raw)?;
    validate_engine_config(raw)?;
    validate_task_dependencies(raw)?;
    validate_targets(raw)?;
    Ok(())
}

fn ensure_has_tasks(raw: &RawManifest) -> Result<()> {
    if raw.task.is_empty() {
        return Err(DynadagError::ConfigError(
            "manifest must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_engine_config(raw: &RawManifest) -> Result<()> {
    if raw.engine.blocking_workers == 0 {
        return Err(DynadagError::ConfigError(
            "[engine].blocking_workers must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_dependencies(raw: &RawManifest) -> Result<()> {
    for (name, task) in raw.task.iter() {
        for dep in task.after.iter() {
            if !raw.task.contains_key(dep) {
                return Err(DynadagError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(DynadagError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_targets(raw: &RawManifest) -> Result<()> {
    for (name, task) in raw.task.iter() {
        if task.target.is_some() && task.cmd.is_none() {
            return Err(DynadagError::ConfigError(format!(
                "task '{}' declares a `target` but no `cmd` to build it",
                name
            )));
        }
        if task.cmd.is_some() && task.value.is_some() {
            return Err(DynadagError::ConfigError(format!(
                "task '{}' sets both `cmd` and `value`; pick one",
                name
            )));
        }
    }
    Ok(())
}
