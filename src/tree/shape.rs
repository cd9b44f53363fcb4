// src/tree/shape.rs

//! Static, hook-free view of a built task tree.

use serde::{Deserialize, Serialize};

/// Description plus ordered children of a task node.
///
/// Serialised with the compact keys `d` (omitted when absent) and `c`, the
/// form carried by the `valid` wire message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeDescriptor {
    #[serde(rename = "d", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "c", default)]
    pub children: Vec<ShapeDescriptor>,
}

impl ShapeDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn described(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: ShapeDescriptor) -> Self {
        self.children.push(child);
        self
    }

    /// Total number of nodes in this shape, itself included.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(ShapeDescriptor::node_count)
            .sum::<usize>()
    }
}
