// src/types.rs

//! Small value types shared by the builder, runner, progress tree and wire
//! codec.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Root-relative path of child-insertion indices identifying a node.
///
/// The root is the empty address; the child added third by the root's first
/// child is `[0, 2]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(Vec<usize>);

impl Address {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Address of this node's child at `index`.
    pub fn child(&self, index: usize) -> Self {
        let mut path = Vec::with_capacity(self.0.len() + 1);
        path.extend_from_slice(&self.0);
        path.push(index);
        Self(path)
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for Address {
    fn from(path: Vec<usize>) -> Self {
        Self(path)
    }
}

impl From<&[usize]> for Address {
    fn from(path: &[usize]) -> Self {
        Self(path.to_vec())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("root");
        }
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Message code carried in the second position of every wire message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Code {
    /// Initial message carrying the static shape of the tree.
    Valid,
    Begin,
    Done,
    Info,
    Warn,
    Error,
    /// The producer or the consumer pipeline broke.
    Fatal,
}

impl Code {
    pub fn as_str(self) -> &'static str {
        match self {
            Code::Valid => "valid",
            Code::Begin => "begin",
            Code::Done => "done",
            Code::Info => "info",
            Code::Warn => "warn",
            Code::Error => "error",
            Code::Fatal => "fatal",
        }
    }

    /// Codes that are addressed to a single node.
    pub fn is_node_code(self) -> bool {
        !matches!(self, Code::Valid | Code::Fatal)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Code {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "valid" => Ok(Code::Valid),
            "begin" => Ok(Code::Begin),
            "done" => Ok(Code::Done),
            "info" => Ok(Code::Info),
            "warn" => Ok(Code::Warn),
            "error" => Ok(Code::Error),
            "fatal" => Ok(Code::Fatal),
            other => Err(format!(
                "invalid message code: {other} (expected one of valid, begin, done, info, warn, error, fatal)"
            )),
        }
    }
}

/// The subset of codes a node's own hooks may emit.
///
/// `begin` and `done` belong to the runner; `valid` and `fatal` to the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl From<Severity> for Code {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Info => Code::Info,
            Severity::Warn => Code::Warn,
            Severity::Error => Code::Error,
        }
    }
}
