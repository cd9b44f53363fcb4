// src/progress.rs

//! Live completion counter derived from a tree's static shape.

use tracing::trace;

use crate::errors::{Result, TaskTreeError};
use crate::message::Message;
use crate::tree::ShapeDescriptor;
use crate::types::{Address, Code};

/// Numerator/denominator completion counts for every node of a task tree.
///
/// `total()` is fixed at construction: one for the node plus the totals of
/// its children. `completed()` counts the completed nodes in the subtree and
/// only ever grows, one step per completion applied at or below this node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressTree {
    description: String,
    total: usize,
    completed: usize,
    own_complete: bool,
    children: Vec<ProgressTree>,
}

impl ProgressTree {
    pub fn new(shape: &ShapeDescriptor) -> Self {
        let children: Vec<ProgressTree> = shape.children.iter().map(ProgressTree::new).collect();
        let total = 1 + children.iter().map(|c| c.total).sum::<usize>();
        Self {
            description: shape.description.clone().unwrap_or_default(),
            total,
            completed: 0,
            own_complete: false,
            children,
        }
    }

    /// The node's description, empty when none was given.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }

    /// Child handles in order. Each call starts a fresh pass over the same
    /// nodes.
    pub fn children(&self) -> std::slice::Iter<'_, ProgressTree> {
        self.children.iter()
    }

    /// Look up the node at `address`, relative to this node.
    pub fn node(&self, address: &Address) -> Option<&ProgressTree> {
        address
            .indices()
            .iter()
            .try_fold(self, |node, &index| node.children.get(index))
    }

    /// Mark the node at `address` complete, adding one to it and to every
    /// node on the path above it.
    ///
    /// An unknown address or a second completion of the same node is
    /// rejected and leaves every count untouched.
    pub fn apply_completion(&mut self, address: &Address) -> Result<()> {
        let target = self
            .node(address)
            .ok_or_else(|| TaskTreeError::UnknownAddress(address.clone()))?;
        if target.own_complete {
            return Err(TaskTreeError::AlreadyComplete(address.clone()));
        }

        let mut node = self;
        node.completed += 1;
        for &index in address.indices() {
            node = &mut node.children[index];
            node.completed += 1;
        }
        node.own_complete = true;

        trace!(%address, "completion applied");
        Ok(())
    }

    /// Apply a message and return the text to show for it.
    ///
    /// A `done` message completes its node and yields that node's
    /// description; other node messages yield their own text. `valid` and
    /// `fatal` messages yield nothing.
    pub fn complete(&mut self, message: &Message) -> Result<Option<String>> {
        match message {
            Message::Node {
                code: Code::Done,
                address,
                ..
            } => {
                self.apply_completion(address)?;
                Ok(self.node(address).map(|n| n.description.clone()))
            }
            Message::Node { text, .. } => Ok(Some(text.clone())),
            Message::Valid { .. } | Message::Fatal { .. } => Ok(None),
        }
    }

    /// Parse one wire-format JSON line and apply it like [`complete`](Self::complete).
    pub fn complete_raw(&mut self, line: &str) -> Result<Option<String>> {
        let message = Message::from_json_line(line)?;
        self.complete(&message)
    }
}

impl From<&ShapeDescriptor> for ProgressTree {
    fn from(shape: &ShapeDescriptor) -> Self {
        ProgressTree::new(shape)
    }
}

impl<'a> IntoIterator for &'a ProgressTree {
    type Item = &'a ProgressTree;
    type IntoIter = std::slice::Iter<'a, ProgressTree>;

    fn into_iter(self) -> Self::IntoIter {
        self.children()
    }
}
