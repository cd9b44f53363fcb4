// src/tree/error_tree.rs

//! Structured failure report mirroring the failing part of a task tree.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Failure report with the same child ordering as the task tree it describes.
///
/// A node that failed on its own carries its message and no children; a node
/// that failed only because some children failed carries those children's
/// trees (in child-index order) and no messages. Successful children never
/// appear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorTree {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub messages: Vec<String>,
    #[serde(default)]
    pub children: Vec<ErrorTree>,
}

impl ErrorTree {
    /// A node that failed on its own.
    pub fn leaf(description: Option<String>, message: impl Into<String>) -> Self {
        Self {
            description,
            messages: vec![message.into()],
            children: Vec::new(),
        }
    }

    /// A node that failed because the given children failed.
    pub fn branch(description: Option<String>, children: Vec<ErrorTree>) -> Self {
        Self {
            description,
            messages: Vec::new(),
            children,
        }
    }

    /// Whether this node's own step failed (as opposed to only descendants).
    pub fn is_own_failure(&self) -> bool {
        !self.messages.is_empty()
    }

    /// Number of nodes in this report whose own step failed.
    pub fn own_failure_count(&self) -> usize {
        usize::from(self.is_own_failure())
            + self
                .children
                .iter()
                .map(ErrorTree::own_failure_count)
                .sum::<usize>()
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, indent: &str) -> fmt::Result {
        writeln!(f, "{indent}{}:", self.description.as_deref().unwrap_or(""))?;
        for message in &self.messages {
            writeln!(f, "{indent}  {message}")?;
        }
        let nested = format!("{indent}  ");
        for child in &self.children {
            child.fmt_indented(f, &nested)?;
        }
        Ok(())
    }
}

impl fmt::Display for ErrorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, "")
    }
}

impl std::error::Error for ErrorTree {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_indents_children_under_their_parent() {
        let tree = ErrorTree::branch(
            Some("install".to_string()),
            vec![ErrorTree::leaf(Some("fetch".to_string()), "timed out")],
        );

        assert_eq!(tree.to_string(), "install:\n  fetch:\n    timed out\n");
    }

    #[test]
    fn counts_only_nodes_that_failed_on_their_own() {
        let tree = ErrorTree::branch(
            None,
            vec![
                ErrorTree::leaf(None, "a"),
                ErrorTree::branch(None, vec![ErrorTree::leaf(None, "b")]),
            ],
        );

        assert!(!tree.is_own_failure());
        assert_eq!(tree.own_failure_count(), 2);
    }

    #[test]
    fn missing_description_is_omitted_from_json() {
        let json = serde_json::to_string(&ErrorTree::leaf(None, "X")).unwrap();
        assert_eq!(json, r#"{"messages":["X"],"children":[]}"#);
    }
}
