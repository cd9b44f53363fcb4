// src/tree/builder.rs

//! Task tree builder.
//!
//! Every node's setup callback runs in its own Tokio task, and every `add`
//! call spawns the child's build as another task straight away. A node's
//! build settles only after its own setup *and* all of its children's builds
//! have settled; no failure ever cuts a sibling short.

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, warn};

use crate::errors::{join_failure_message, settle};
use crate::tree::error_tree::ErrorTree;
use crate::tree::node::{StepFuture, TaskNode};
use crate::tree::payload::Payload;
use crate::types::Address;

/// Result of building one node.
pub type BuildOutcome = std::result::Result<TaskNode, ErrorTree>;

/// A boxed setup callback.
pub type Setup = Box<dyn FnOnce(Payload) -> StepFuture + Send + 'static>;

type BuildFuture = Pin<Box<dyn Future<Output = BuildOutcome> + Send + 'static>>;

pub(crate) fn boxed_setup<F, Fut>(setup: F) -> Setup
where
    F: FnOnce(Payload) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Box::new(move |payload| Box::pin(setup(payload)))
}

/// Build a task tree from the root's setup callback.
///
/// Returns the root [`TaskNode`] when every setup callback succeeded, and an
/// [`ErrorTree`] describing the failed nodes otherwise.
pub async fn build<F, Fut>(setup: F) -> BuildOutcome
where
    F: FnOnce(Payload) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    build_node(Address::root(), boxed_setup(setup)).await
}

pub(crate) fn build_node(address: Address, setup: Setup) -> BuildFuture {
    Box::pin(async move {
        debug!(%address, "building task node");
        let payload = Payload::new(address.clone());

        // A panic inside the callback, before or after its first await, is
        // reported the same way as an `Err` return.
        let own = {
            let payload = payload.clone();
            settle(tokio::spawn(async move { setup(payload).await }).await)
        };

        let sealed = payload.seal();
        let mut child_outcomes = Vec::with_capacity(sealed.children.len());
        for handle in sealed.children {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(err) => Err(ErrorTree::leaf(None, join_failure_message(err))),
            };
            child_outcomes.push(outcome);
        }

        if let Err(message) = own {
            let discarded = child_outcomes.iter().filter(|o| o.is_err()).count();
            warn!(
                %address,
                error = %message,
                discarded_child_failures = discarded,
                "task setup failed"
            );
            return Err(ErrorTree::leaf(sealed.description, message));
        }

        let mut children = Vec::with_capacity(child_outcomes.len());
        let mut failed = Vec::new();
        for outcome in child_outcomes {
            match outcome {
                Ok(node) => children.push(node),
                Err(tree) => failed.push(tree),
            }
        }

        if !failed.is_empty() {
            debug!(%address, failed_children = failed.len(), "children failed to build");
            return Err(ErrorTree::branch(sealed.description, failed));
        }

        debug!(%address, children = children.len(), "task node built");
        Ok(TaskNode {
            address,
            description: sealed.description,
            hooks: sealed.hooks,
            children,
        })
    })
}
