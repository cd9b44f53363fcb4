#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tasktree::ShapeDescriptor;
use tasktree::exec::NodeLog;
use tasktree::tree::Payload;

/// Shared, ordered record of hook invocations: `"<address> <phase>"`.
pub type ExecutionLog = Arc<Mutex<Vec<String>>>;

type SetupFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// Shape with the given children and no description.
pub fn shape(children: Vec<ShapeDescriptor>) -> ShapeDescriptor {
    ShapeDescriptor {
        description: None,
        children,
    }
}

/// Shape without children.
pub fn leaf() -> ShapeDescriptor {
    ShapeDescriptor::new()
}

/// Declarative description of a task node for tests: what it is called,
/// which of its steps fail, and its children.
#[derive(Clone, Default)]
pub struct NodeSpec {
    description: Option<String>,
    fail_setup: Option<String>,
    fail_before: Option<String>,
    fail_run: Option<String>,
    fail_after: Option<String>,
    children: Vec<NodeSpec>,
    trace: Option<ExecutionLog>,
}

impl NodeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn described(description: &str) -> Self {
        Self {
            description: Some(description.to_string()),
            ..Self::default()
        }
    }

    pub fn child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn fail_setup(mut self, message: &str) -> Self {
        self.fail_setup = Some(message.to_string());
        self
    }

    pub fn fail_before(mut self, message: &str) -> Self {
        self.fail_before = Some(message.to_string());
        self
    }

    pub fn fail_run(mut self, message: &str) -> Self {
        self.fail_run = Some(message.to_string());
        self
    }

    pub fn fail_after(mut self, message: &str) -> Self {
        self.fail_after = Some(message.to_string());
        self
    }

    /// Record every hook of this node and its descendants into `log`.
    pub fn traced(mut self, log: &ExecutionLog) -> Self {
        self.trace = Some(Arc::clone(log));
        self.children = self
            .children
            .into_iter()
            .map(|child| child.traced(log))
            .collect();
        self
    }

    /// Setup callback that builds this node.
    pub fn into_setup(self) -> impl FnOnce(Payload) -> SetupFuture + Send + 'static {
        move |payload: Payload| -> SetupFuture { Box::pin(async move { self.apply(payload) }) }
    }

    fn apply(self, payload: Payload) -> anyhow::Result<()> {
        if let Some(description) = self.description {
            payload.describe(description)?;
        }
        for child in self.children {
            payload.add(child.into_setup())?;
        }

        let address = payload.address().to_string();
        let trace = self.trace;
        let hook = |phase: &'static str, failure: Option<String>| {
            let trace = trace.clone();
            let address = address.clone();
            move |_log: NodeLog| async move {
                if let Some(trace) = trace {
                    trace.lock().unwrap().push(format!("{address} {phase}"));
                }
                match failure {
                    Some(message) => Err(anyhow!(message)),
                    None => Ok(()),
                }
            }
        };
        payload.run_before(hook("before", self.fail_before));
        payload.run(hook("run", self.fail_run));
        payload.run_after(hook("after", self.fail_after));

        match self.fail_setup {
            Some(message) => Err(anyhow!(message)),
            None => Ok(()),
        }
    }
}
