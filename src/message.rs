// src/message.rs

//! Messages emitted while a task tree runs, and their positional wire form.
//!
//! ```text
//! [timestampMillis, "valid", {"d": "...", "c": [...]}]
//! [timestampMillis, "begin" | "done" | "info" | "warn" | "error", ...address, text]
//! [timestampMillis, "fatal", errorValue]
//! ```
//!
//! Node-addressed messages always carry a trailing text element, empty when
//! there is nothing to say. A fatal error value is the error tree's JSON object
//! when the cause is a build or run failure, and the error's text otherwise.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Result, TaskTreeError};
use crate::tree::{ErrorTree, ShapeDescriptor};
use crate::types::{Address, Code};

/// Current time as Unix milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug)]
pub enum Message {
    /// Static shape of the tree about to run. Always the first message.
    Valid {
        timestamp: i64,
        shape: ShapeDescriptor,
    },
    /// A message addressed to one node.
    Node {
        timestamp: i64,
        code: Code,
        address: Address,
        text: String,
    },
    /// The run (or the pipeline around it) failed irrecoverably.
    Fatal {
        timestamp: i64,
        error: TaskTreeError,
    },
}

impl Message {
    pub fn valid(shape: ShapeDescriptor) -> Self {
        Message::Valid {
            timestamp: now_millis(),
            shape,
        }
    }

    /// A node-addressed message. `code` must not be `valid` or `fatal`.
    pub fn node(code: Code, address: Address, text: impl Into<String>) -> Self {
        debug_assert!(code.is_node_code(), "{code} is not a node-addressed code");
        Message::Node {
            timestamp: now_millis(),
            code,
            address,
            text: text.into(),
        }
    }

    pub fn fatal(error: TaskTreeError) -> Self {
        Message::Fatal {
            timestamp: now_millis(),
            error,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            Message::Valid { timestamp, .. }
            | Message::Node { timestamp, .. }
            | Message::Fatal { timestamp, .. } => *timestamp,
        }
    }

    pub fn code(&self) -> Code {
        match self {
            Message::Valid { .. } => Code::Valid,
            Message::Node { code, .. } => *code,
            Message::Fatal { .. } => Code::Fatal,
        }
    }

    pub fn address(&self) -> Option<&Address> {
        match self {
            Message::Node { address, .. } => Some(address),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Message::Node { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Whether this message is addressed to the root node.
    pub fn is_for_root(&self) -> bool {
        self.address().is_some_and(Address::is_root)
    }

    /// Encode as a single JSON line (no trailing newline).
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode one JSON line of the wire format.
    pub fn from_json_line(line: &str) -> Result<Self> {
        let parts: Vec<Value> = serde_json::from_str(line)?;
        Message::try_from(parts)
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Message::Valid { timestamp, shape } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(timestamp)?;
                seq.serialize_element(&Code::Valid)?;
                seq.serialize_element(shape)?;
                seq.end()
            }
            Message::Node {
                timestamp,
                code,
                address,
                text,
            } => {
                let mut seq = serializer.serialize_seq(Some(3 + address.depth()))?;
                seq.serialize_element(timestamp)?;
                seq.serialize_element(code)?;
                for index in address.indices() {
                    seq.serialize_element(index)?;
                }
                seq.serialize_element(text)?;
                seq.end()
            }
            Message::Fatal { timestamp, error } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(timestamp)?;
                seq.serialize_element(&Code::Fatal)?;
                match error.error_tree() {
                    Some(tree) => seq.serialize_element(tree)?,
                    None => seq.serialize_element(&error.to_string())?,
                }
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let parts = Vec::<Value>::deserialize(deserializer)?;
        Message::try_from(parts).map_err(de::Error::custom)
    }
}

impl TryFrom<Vec<Value>> for Message {
    type Error = TaskTreeError;

    fn try_from(parts: Vec<Value>) -> Result<Self> {
        let invalid = |why: &str| TaskTreeError::InvalidMessage(why.to_string());

        let mut parts = parts.into_iter();
        let timestamp = parts
            .next()
            .and_then(|v| v.as_i64())
            .ok_or_else(|| invalid("first element must be an integer timestamp"))?;
        let code: Code = parts
            .next()
            .and_then(|v| v.as_str().map(str::to_owned))
            .ok_or_else(|| invalid("second element must be a message code"))?
            .parse()
            .map_err(TaskTreeError::InvalidMessage)?;
        let rest: Vec<Value> = parts.collect();

        match code {
            Code::Valid => {
                let [shape] = <[Value; 1]>::try_from(rest)
                    .map_err(|_| invalid("\"valid\" carries exactly one shape"))?;
                Ok(Message::Valid {
                    timestamp,
                    shape: serde_json::from_value(shape)?,
                })
            }
            Code::Fatal => {
                let value = rest.into_iter().next().unwrap_or(Value::Null);
                let error = match value {
                    Value::String(text) => TaskTreeError::Fatal(text),
                    Value::Object(ref fields)
                        if fields.contains_key("messages") || fields.contains_key("children") =>
                    {
                        match serde_json::from_value::<ErrorTree>(value.clone()) {
                            Ok(tree) => TaskTreeError::Run(tree),
                            Err(_) => TaskTreeError::Fatal(value.to_string()),
                        }
                    }
                    other => TaskTreeError::Fatal(other.to_string()),
                };
                Ok(Message::Fatal { timestamp, error })
            }
            code => {
                let mut rest = rest;
                let text = if matches!(rest.last(), Some(Value::String(_))) {
                    rest.pop()
                        .and_then(|v| v.as_str().map(str::to_owned))
                        .unwrap_or_default()
                } else {
                    String::new()
                };
                let indices = rest
                    .iter()
                    .map(|v| v.as_u64().and_then(|i| usize::try_from(i).ok()))
                    .collect::<Option<Vec<usize>>>()
                    .ok_or_else(|| invalid("address elements must be non-negative integers"))?;
                Ok(Message::Node {
                    timestamp,
                    code,
                    address: Address::from(indices),
                    text,
                })
            }
        }
    }
}
