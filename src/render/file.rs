// src/render/file.rs

//! Persistent JSON-lines message sink.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::error;

use crate::errors::Result;
use crate::exec::MessageSink;
use crate::message::Message;

/// Appends every emitted message to a file as one JSON line.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesSink {
    /// Open `path` for appending, creating it (and its parent directory) if
    /// needed.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MessageSink for JsonLinesSink {
    fn emit(&self, message: Message) {
        let line = match message.to_json_line() {
            Ok(line) => line,
            Err(err) => {
                error!(path = ?self.path, error = %err, "failed to encode message");
                return;
            }
        };

        let mut file = self
            .file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(err) = writeln!(file, "{line}") {
            error!(path = ?self.path, error = %err, "failed to append message");
        }
    }
}
