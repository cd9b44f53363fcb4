// src/render/replay.rs

//! Feed a recorded JSON-lines log back through a mediator.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::errors::{Result, TaskTreeError};
use crate::mediator::{Consumer, Mediator};
use crate::message::Message;

/// Replay the messages recorded in `path` into `consumer`.
///
/// Returns the number of messages read. The outcome is the mediator's: a
/// log that stops before the root's `done` ends with
/// [`TaskTreeError::StreamClosed`], one ending in `fatal` with that error.
pub async fn replay<C: Consumer>(path: impl AsRef<Path>, consumer: C) -> Result<usize> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let messages = contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            Message::from_json_line(line).map_err(|err| {
                TaskTreeError::InvalidMessage(format!("{:?} line {}: {err}", path, n + 1))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let count = messages.len();
    info!(?path, messages = count, "replaying message log");

    let mediator = Mediator::new(consumer);
    let emitter = mediator.emitter();
    for message in messages {
        emitter.emit(message);
    }
    drop(emitter);
    debug!("replay input exhausted");

    mediator.outcome().await?;
    Ok(count)
}
