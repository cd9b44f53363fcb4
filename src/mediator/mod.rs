// src/mediator/mod.rs

//! Rendezvous between the runner's message stream and a consumer.
//!
//! A [`Mediator`] owns the receiving end of the message channel. Its
//! background task:
//! - builds the [`ProgressTree`] from the first (`valid`) message and
//!   resolves the "shape known" slot with the tree's total;
//! - fails at once on a `fatal` message, even while the consumer is still
//!   busy with an earlier one;
//! - otherwise applies `done` completions, forwards the message to the
//!   [`Consumer`], and succeeds as soon as the root is complete.
//!
//! The terminal slot is written exactly once. After that the task stops
//! listening; anything still emitted is dropped.
//!
//! [`Logger`] is the producer-side companion: it emits the shape first and
//! turns a failed run into a `fatal` message.

pub mod consumer;
pub mod logger;

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::errors::{Result, TaskTreeError};
use crate::exec::Emitter;
use crate::message::Message;
use crate::progress::ProgressTree;

pub use consumer::{ConsumeFuture, Consumer};
pub use logger::Logger;

pub struct Mediator {
    emitter: Emitter,
    ready: Option<oneshot::Receiver<usize>>,
    total: Option<usize>,
    outcome: oneshot::Receiver<Result<()>>,
}

impl Mediator {
    /// Create a mediator and start its listening task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new<C: Consumer>(consumer: C) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Message>();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();

        tokio::spawn(async move {
            let result = listen(consumer, rx, ready_tx).await;
            match &result {
                Ok(()) => info!("task tree completed"),
                Err(err) => warn!(error = %err, "mediator settled with failure"),
            }
            if outcome_tx.send(result).is_err() {
                debug!("mediator outcome dropped before settling");
            }
        });

        Self {
            emitter: Arc::new(tx),
            ready: Some(ready_rx),
            total: None,
            outcome: outcome_rx,
        }
    }

    /// The raw emitter feeding this mediator.
    pub fn emitter(&self) -> Emitter {
        Arc::clone(&self.emitter)
    }

    /// Wait until the shape is known and return the tree's total.
    ///
    /// Returns `None` if the mediator settled before any shape arrived.
    pub async fn ready(&mut self) -> Option<usize> {
        if self.total.is_none() {
            if let Some(rx) = self.ready.take() {
                self.total = rx.await.ok();
            }
        }
        self.total
    }

    /// Wait for the terminal outcome.
    ///
    /// This drops the mediator's own emitter handle, so the stream is
    /// considered closed once every producer has dropped theirs too.
    pub async fn outcome(self) -> Result<()> {
        let Mediator {
            emitter, outcome, ..
        } = self;
        drop(emitter);

        outcome.await.unwrap_or_else(|_| {
            Err(TaskTreeError::Fatal(
                "mediator stopped without settling".to_string(),
            ))
        })
    }
}

async fn listen<C: Consumer>(
    mut consumer: C,
    mut rx: mpsc::UnboundedReceiver<Message>,
    ready_tx: oneshot::Sender<usize>,
) -> Result<()> {
    let mut tree = match rx.recv().await {
        Some(Message::Valid { shape, .. }) => ProgressTree::new(&shape),
        // Nothing runs before the shape is sent, so a fatal tree here can
        // only come from a failed build.
        Some(Message::Fatal {
            error: TaskTreeError::Run(tree),
            ..
        }) => return Err(TaskTreeError::Build(tree)),
        Some(Message::Fatal { error, .. }) => return Err(error),
        Some(other) => {
            warn!(code = %other.code(), "first message did not carry the tree shape");
            return Err(TaskTreeError::MissingShape);
        }
        None => return Err(TaskTreeError::StreamClosed),
    };

    debug!(total = tree.total(), "task tree shape received");
    let _ = ready_tx.send(tree.total());

    let mut backlog = VecDeque::new();
    loop {
        let message = match backlog.pop_front() {
            Some(message) => message,
            None => rx.recv().await.ok_or(TaskTreeError::StreamClosed)?,
        };

        match message {
            Message::Fatal { error, .. } => return Err(error),
            Message::Valid { .. } => {
                warn!("ignoring repeated shape message");
            }
            node @ Message::Node { .. } => {
                // Completions land before the consumer sees the message, so
                // the counts it renders include this one.
                tree.complete(&node)?;
                deliver(&mut consumer, &tree, &node, &mut rx, &mut backlog).await?;

                if tree.is_complete() {
                    return Ok(());
                }
            }
        }
    }
}

/// Hand one message to the consumer while still draining the stream.
///
/// A `fatal` arriving meanwhile settles at once, whether or not the
/// consumer's future ever does. Other messages queue up in `backlog` and are
/// delivered in order afterwards.
async fn deliver<C: Consumer>(
    consumer: &mut C,
    tree: &ProgressTree,
    message: &Message,
    rx: &mut mpsc::UnboundedReceiver<Message>,
    backlog: &mut VecDeque<Message>,
) -> Result<()> {
    let mut consumed = consumer.consume(tree, message);
    let mut open = true;

    loop {
        tokio::select! {
            result = &mut consumed => {
                return result.map_err(TaskTreeError::Consumer);
            }
            incoming = rx.recv(), if open => match incoming {
                Some(Message::Fatal { error, .. }) => {
                    debug!(queued = backlog.len(), "fatal received while consumer busy");
                    return Err(error);
                }
                Some(other) => backlog.push_back(other),
                None => open = false,
            },
        }
    }
}
