// src/tree/payload.rs

//! Build-time capability handle given to every setup callback.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::{Result, TaskTreeError};
use crate::exec::NodeLog;
use crate::tree::builder::{BuildOutcome, Setup, boxed_setup, build_node};
use crate::tree::node::{Hook, Hooks, boxed_hook};
use crate::types::{Address, Severity};

/// Handle through which a setup callback describes its node.
///
/// Cheap to clone; every clone refers to the same node. The handle stays
/// usable across `.await` points for as long as the node's own setup is
/// running. Once that setup settles the node is sealed: its children list
/// is frozen and further changes are rejected.
#[derive(Clone)]
pub struct Payload {
    inner: Arc<PayloadInner>,
}

struct PayloadInner {
    address: Address,
    state: Mutex<PayloadState>,
}

#[derive(Default)]
struct PayloadState {
    description: Option<String>,
    hooks: Hooks,
    children: Vec<JoinHandle<BuildOutcome>>,
    sealed: bool,
}

/// Everything a sealed payload hands back to the builder.
pub(crate) struct SealedPayload {
    pub description: Option<String>,
    pub hooks: Hooks,
    pub children: Vec<JoinHandle<BuildOutcome>>,
}

impl Payload {
    pub(crate) fn new(address: Address) -> Self {
        Self {
            inner: Arc::new(PayloadInner {
                address,
                state: Mutex::new(PayloadState::default()),
            }),
        }
    }

    pub fn address(&self) -> &Address {
        &self.inner.address
    }

    /// Set the node's description. It can be set only once.
    pub fn describe(&self, description: impl Into<String>) -> Result<()> {
        let mut state = self.state();
        if state.sealed {
            return Err(TaskTreeError::PayloadSealed(self.inner.address.clone()));
        }
        if state.description.is_some() {
            return Err(TaskTreeError::DescriptionAlreadySet(
                self.inner.address.clone(),
            ));
        }
        state.description = Some(description.into());
        Ok(())
    }

    pub fn description(&self) -> Option<String> {
        self.state().description.clone()
    }

    /// Hook run first, before `run`. A later call replaces the hook.
    pub fn run_before<F, Fut>(&self, hook: F)
    where
        F: FnOnce(NodeLog) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.set_hook("run_before", |hooks| &mut hooks.run_before, hook);
    }

    /// The node's main hook. A later call replaces the hook.
    pub fn run<F, Fut>(&self, hook: F)
    where
        F: FnOnce(NodeLog) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.set_hook("run", |hooks| &mut hooks.run, hook);
    }

    /// Hook run once every child has succeeded. A later call replaces the hook.
    pub fn run_after<F, Fut>(&self, hook: F)
    where
        F: FnOnce(NodeLog) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.set_hook("run_after", |hooks| &mut hooks.run_after, hook);
    }

    /// Add a child and immediately start building it, concurrently with the
    /// rest of this node's setup and with its siblings.
    ///
    /// Returns the child's address.
    pub fn add<F, Fut>(&self, setup: F) -> Result<Address>
    where
        F: FnOnce(Payload) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add_boxed(boxed_setup(setup))
    }

    pub(crate) fn add_boxed(&self, setup: Setup) -> Result<Address> {
        let mut state = self.state();
        if state.sealed {
            return Err(TaskTreeError::PayloadSealed(self.inner.address.clone()));
        }

        let address = self.inner.address.child(state.children.len());
        debug!(parent = %self.inner.address, child = %address, "adding child task");
        state
            .children
            .push(tokio::spawn(build_node(address.clone(), setup)));
        Ok(address)
    }

    /// Build-time log. No message sink exists until the whole tree is built,
    /// so these only reach `tracing`.
    pub fn log(&self, severity: Severity, text: impl AsRef<str>) {
        debug!(
            address = %self.inner.address,
            ?severity,
            text = text.as_ref(),
            "build-time log message (not forwarded)"
        );
    }

    pub(crate) fn seal(&self) -> SealedPayload {
        let mut state = self.state();
        state.sealed = true;
        SealedPayload {
            description: state.description.clone(),
            hooks: std::mem::take(&mut state.hooks),
            children: std::mem::take(&mut state.children),
        }
    }

    fn set_hook<F, Fut>(
        &self,
        name: &'static str,
        slot: impl FnOnce(&mut Hooks) -> &mut Option<Hook>,
        hook: F,
    ) where
        F: FnOnce(NodeLog) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let mut state = self.state();
        if state.sealed {
            warn!(
                address = %self.inner.address,
                hook = name,
                "hook set after setup settled; ignoring"
            );
            return;
        }
        *slot(&mut state.hooks) = Some(boxed_hook(hook));
    }

    // User code never runs while this lock is held, so a poisoned state is
    // still consistent.
    fn state(&self) -> MutexGuard<'_, PayloadState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
