// src/config/validate.rs

use crate::config::model::{RawSettings, Settings};
use crate::errors::{Result, TaskTreeError};

impl TryFrom<RawSettings> for Settings {
    type Error = TaskTreeError;

    fn try_from(raw: RawSettings) -> std::result::Result<Self, Self::Error> {
        validate_raw_settings(&raw)?;
        Ok(Settings::new_unchecked(raw.console, raw.output))
    }
}

fn validate_raw_settings(raw: &RawSettings) -> Result<()> {
    validate_log_file(raw)?;
    Ok(())
}

fn validate_log_file(raw: &RawSettings) -> Result<()> {
    let Some(path) = raw.output.log_file.as_ref() else {
        return Ok(());
    };

    if path.as_os_str().is_empty() {
        return Err(TaskTreeError::ConfigError(
            "[output].log_file must not be empty".to_string(),
        ));
    }
    if path.is_dir() {
        return Err(TaskTreeError::ConfigError(format!(
            "[output].log_file {:?} is a directory",
            path
        )));
    }
    Ok(())
}
