// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{RawSettings, Settings};
use crate::errors::Result;

/// Load a settings file and return the raw, unvalidated settings.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawSettings> {
    let path = path.as_ref();
    debug!(?path, "reading settings file");
    let contents = fs::read_to_string(path)?;
    let raw: RawSettings = toml::from_str(&contents)?;
    Ok(raw)
}

/// Load a settings file from path and validate it.
///
/// This is the recommended entry point for the rest of the application.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Settings> {
    let raw = load_from_path(&path)?;
    Settings::try_from(raw)
}

/// Load settings from `path` when that file exists, defaults otherwise.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<Settings> {
    let path = path.as_ref();
    if path.exists() {
        load_and_validate(path)
    } else {
        debug!(?path, "no settings file; using defaults");
        Ok(Settings::default())
    }
}

/// `Tasktree.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Tasktree.toml")
}
