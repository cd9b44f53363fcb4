// src/tree/node.rs

//! Immutable task node produced by a successful build.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::exec::NodeLog;
use crate::tree::shape::ShapeDescriptor;
use crate::types::Address;

/// Future returned by setup callbacks and run hooks.
pub type StepFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// A run-phase hook. Invoked at most once, with the node's bound log.
pub type Hook = Box<dyn FnOnce(NodeLog) -> StepFuture + Send + 'static>;

/// Box an async closure into a [`Hook`].
pub(crate) fn boxed_hook<F, Fut>(hook: F) -> Hook
where
    F: FnOnce(NodeLog) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Box::new(move |log| Box::pin(hook(log)))
}

/// The three run-phase hooks of a node. Absent hooks are no-ops.
#[derive(Default)]
pub struct Hooks {
    pub run_before: Option<Hook>,
    pub run: Option<Hook>,
    pub run_after: Option<Hook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("run_before", &self.run_before.is_some())
            .field("run", &self.run.is_some())
            .field("run_after", &self.run_after.is_some())
            .finish()
    }
}

/// A built node: address, description, hooks and children in `add` order.
///
/// Running a node consumes it, since hooks run at most once.
#[derive(Debug)]
pub struct TaskNode {
    pub(crate) address: Address,
    pub(crate) description: Option<String>,
    pub(crate) hooks: Hooks,
    pub(crate) children: Vec<TaskNode>,
}

impl TaskNode {
    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn children(&self) -> &[TaskNode] {
        &self.children
    }

    /// Static view of this subtree with hooks stripped.
    pub fn shape(&self) -> ShapeDescriptor {
        ShapeDescriptor {
            description: self.description.clone(),
            children: self.children.iter().map(TaskNode::shape).collect(),
        }
    }
}
