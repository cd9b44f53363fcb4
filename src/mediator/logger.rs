// src/mediator/logger.rs

//! Producer-side wrapper around a raw emitter.

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::errors::{Result, TaskTreeError, join_failure_message};
use crate::exec::{Emitter, RunOutcome};
use crate::message::Message;
use crate::tree::{ErrorTree, ShapeDescriptor};

/// Handle returned for a successfully built tree.
///
/// Creating it emits the `valid` shape message straight away, so the shape
/// always precedes anything the runner emits. Once the run is attached with
/// [`store_process`](Self::store_process), a failed run is also reported on
/// the stream as a `fatal` message, so a listener waiting for completion
/// always learns about the failure.
pub struct Logger {
    emitter: Emitter,
    process: Option<JoinHandle<RunOutcome>>,
}

impl Logger {
    pub fn new(emitter: Emitter, shape: ShapeDescriptor) -> Self {
        emitter.emit(Message::valid(shape));
        Self {
            emitter,
            process: None,
        }
    }

    /// The raw emitter, for the runner to call once per message.
    pub fn emitter(&self) -> Emitter {
        self.emitter.clone()
    }

    pub fn log(&self, message: Message) {
        self.emitter.emit(message);
    }

    /// Attach the overall run and start driving it.
    pub fn store_process<F>(&mut self, run: F)
    where
        F: Future<Output = RunOutcome> + Send + 'static,
    {
        let emitter = self.emitter.clone();
        self.process = Some(tokio::spawn(async move {
            let outcome = match tokio::spawn(run).await {
                Ok(outcome) => outcome,
                Err(err) => Err(ErrorTree::leaf(None, join_failure_message(err))),
            };
            if let Err(tree) = &outcome {
                debug!("run failed; emitting fatal message");
                emitter.emit(Message::fatal(TaskTreeError::Run(tree.clone())));
            }
            outcome
        }));
    }

    /// Wait for the attached run to settle. Succeeds if nothing was attached.
    pub async fn finished(self) -> Result<()> {
        let Logger { emitter, process } = self;
        drop(emitter);

        let Some(process) = process else {
            return Ok(());
        };
        match process.await {
            Ok(outcome) => outcome.map_err(TaskTreeError::Run),
            Err(err) => Err(TaskTreeError::Fatal(join_failure_message(err))),
        }
    }
}
