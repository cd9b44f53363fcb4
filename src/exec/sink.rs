// src/exec/sink.rs

//! The shared message emitter and the per-node log bound to it.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::message::Message;
use crate::types::{Address, Code, Severity};

/// Destination for emitted messages.
///
/// Shared by every concurrently running node, so implementations must keep
/// emissions in call order and accept concurrent calls.
pub trait MessageSink: Send + Sync {
    fn emit(&self, message: Message);
}

/// The raw emitter handed to the runner.
pub type Emitter = Arc<dyn MessageSink>;

impl MessageSink for mpsc::UnboundedSender<Message> {
    fn emit(&self, message: Message) {
        if let Err(err) = self.send(message) {
            // The receiving side settled and stopped listening.
            debug!(code = %err.0.code(), "message dropped; receiver closed");
        }
    }
}

/// Log emitter bound to a single node's address.
#[derive(Clone)]
pub struct NodeLog {
    address: Address,
    emitter: Emitter,
}

impl NodeLog {
    pub fn new(address: Address, emitter: Emitter) -> Self {
        Self { address, emitter }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn log(&self, severity: Severity, text: impl Into<String>) {
        self.emit(Code::from(severity), text.into());
    }

    pub fn info(&self, text: impl Into<String>) {
        self.log(Severity::Info, text);
    }

    pub fn warn(&self, text: impl Into<String>) {
        self.log(Severity::Warn, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.log(Severity::Error, text);
    }

    pub(crate) fn begin(&self) {
        self.emit(Code::Begin, String::new());
    }

    pub(crate) fn done(&self) {
        self.emit(Code::Done, String::new());
    }

    fn emit(&self, code: Code, text: String) {
        self.emitter
            .emit(Message::node(code, self.address.clone(), text));
    }
}

impl std::fmt::Debug for NodeLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeLog")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
