// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Settings as read from a TOML file, before validation.
///
/// ```toml
/// [console]
/// color = true
/// show_fraction = true
///
/// [output]
/// log_file = "setup.log"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSettings {
    #[serde(default)]
    pub console: ConsoleSettings,

    #[serde(default)]
    pub output: OutputSettings,
}

/// `[console]` section: how the bulleted console renders progress.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleSettings {
    /// Colour the bullets with ANSI escapes.
    #[serde(default = "default_true")]
    pub color: bool,

    /// Append `(completed/total) ...` to completion lines.
    #[serde(default = "default_true")]
    pub show_fraction: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            color: default_true(),
            show_fraction: default_true(),
        }
    }
}

/// `[output]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputSettings {
    /// When set, messages are appended to this file as JSON lines instead
    /// of being rendered on the console.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

/// Validated settings.
///
/// Obtain one through `Settings::try_from(raw)` or
/// [`load_and_validate`](crate::config::load_and_validate).
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub console: ConsoleSettings,
    pub output: OutputSettings,
}

impl Settings {
    pub(crate) fn new_unchecked(console: ConsoleSettings, output: OutputSettings) -> Self {
        Self { console, output }
    }
}
