use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tasktree::exec::MessageSink;
use tasktree::mediator::{ConsumeFuture, Consumer};
use tasktree::message::Message;
use tasktree::{Address, Code, ProgressTree};

/// A sink that keeps every emitted message, in order.
#[derive(Clone, Default)]
pub struct RecordingSink {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(code, address)` of every message so far; `valid`/`fatal` have no
    /// address.
    pub fn codes(&self) -> Vec<(Code, Option<Address>)> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| (m.code(), m.address().cloned()))
            .collect()
    }

    /// Every message so far as a wire-format JSON line.
    pub fn lines(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.to_json_line().unwrap())
            .collect()
    }

    pub fn take(&self) -> Vec<Message> {
        std::mem::take(&mut *self.messages.lock().unwrap())
    }
}

impl MessageSink for RecordingSink {
    fn emit(&self, message: Message) {
        self.messages.lock().unwrap().push(message);
    }
}

/// What a consumer saw for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seen {
    pub code: Code,
    pub address: Option<Address>,
    /// Root counts at the time the message was delivered.
    pub completed: usize,
    pub total: usize,
}

/// A consumer that records every delivery and can be told to fail.
#[derive(Clone, Default)]
pub struct RecordingConsumer {
    seen: Arc<Mutex<Vec<Seen>>>,
    fail_on: Option<Code>,
}

impl RecordingConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first time a message with `code` is delivered.
    pub fn failing_on(code: Code) -> Self {
        Self {
            seen: Arc::default(),
            fail_on: Some(code),
        }
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

impl Consumer for RecordingConsumer {
    fn consume<'a>(&'a mut self, tree: &'a ProgressTree, message: &'a Message) -> ConsumeFuture<'a> {
        self.seen.lock().unwrap().push(Seen {
            code: message.code(),
            address: message.address().cloned(),
            completed: tree.completed(),
            total: tree.total(),
        });
        let fail = self.fail_on == Some(message.code());
        Box::pin(async move {
            if fail {
                Err(anyhow!("consumer rejected {}", message.code()))
            } else {
                Ok(())
            }
        })
    }
}

/// An in-memory writer whose contents can be read while it is owned
/// elsewhere.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
