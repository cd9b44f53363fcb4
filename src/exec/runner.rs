// src/exec/runner.rs

//! Task tree runner.
//!
//! Per node: emit `begin`, run `run_before` then `run`, run every child
//! concurrently and wait for all of them, then run `run_after` and emit
//! `done`. A failing hook fails its node once; a failing child fails its
//! parent only after every sibling has settled.

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, warn};

use crate::errors::{join_failure_message, settle};
use crate::exec::sink::{Emitter, NodeLog};
use crate::tree::{ErrorTree, Hook, TaskNode};
use crate::types::Address;

/// Result of running one node.
pub type RunOutcome = std::result::Result<(), ErrorTree>;

type RunFuture = Pin<Box<dyn Future<Output = RunOutcome> + Send + 'static>>;

/// Run a built tree, emitting messages to `emitter`.
pub async fn run(root: TaskNode, emitter: Emitter) -> RunOutcome {
    run_node(root, emitter).await
}

fn run_node(node: TaskNode, emitter: Emitter) -> RunFuture {
    Box::pin(async move {
        let TaskNode {
            address,
            description,
            hooks,
            children,
        } = node;
        let log = NodeLog::new(address.clone(), emitter.clone());

        log.begin();
        debug!(%address, "task started");

        invoke(hooks.run_before, &log)
            .await
            .map_err(|m| phase_failed(&address, description.as_deref(), "run_before", m))?;
        invoke(hooks.run, &log)
            .await
            .map_err(|m| phase_failed(&address, description.as_deref(), "run", m))?;

        let running: Vec<_> = children
            .into_iter()
            .map(|child| tokio::spawn(run_node(child, emitter.clone())))
            .collect();

        let mut failed = Vec::new();
        for handle in running {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(tree)) => failed.push(tree),
                Err(err) => failed.push(ErrorTree::leaf(None, join_failure_message(err))),
            }
        }

        if !failed.is_empty() {
            debug!(%address, failed_children = failed.len(), "children failed; skipping run_after");
            return Err(ErrorTree::branch(description, failed));
        }

        invoke(hooks.run_after, &log)
            .await
            .map_err(|m| phase_failed(&address, description.as_deref(), "run_after", m))?;

        log.done();
        debug!(%address, "task done");
        Ok(())
    })
}

async fn invoke(hook: Option<Hook>, log: &NodeLog) -> std::result::Result<(), String> {
    let Some(hook) = hook else {
        return Ok(());
    };
    let log = log.clone();
    settle(tokio::spawn(async move { hook(log).await }).await)
}

fn phase_failed(
    address: &Address,
    description: Option<&str>,
    phase: &'static str,
    message: String,
) -> ErrorTree {
    warn!(%address, phase, error = %message, "task hook failed");
    ErrorTree::leaf(description.map(str::to_owned), message)
}
