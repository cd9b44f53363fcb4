// src/errors.rs

//! Crate-wide error type, aliases and helpers.

use thiserror::Error;
use tokio::task::JoinError;

use crate::tree::ErrorTree;
use crate::types::Address;

#[derive(Error, Debug)]
pub enum TaskTreeError {
    /// The task tree could not be built.
    #[error("task tree build failed:\n{0}")]
    Build(ErrorTree),

    /// A built task tree failed while running.
    #[error("task tree run failed:\n{0}")]
    Run(ErrorTree),

    /// A message consumer rejected a message.
    #[error("message consumer failed: {0:#}")]
    Consumer(anyhow::Error),

    /// A fatal message whose cause is only known as text (e.g. read back
    /// from a log file).
    #[error("fatal: {0}")]
    Fatal(String),

    #[error("message stream did not start with a \"valid\" shape message")]
    MissingShape,

    #[error("message stream closed before the root task completed")]
    StreamClosed,

    #[error("no task at address {0}")]
    UnknownAddress(Address),

    #[error("task at address {0} was already marked complete")]
    AlreadyComplete(Address),

    #[error("cannot add a child to {0}: its setup has already settled")]
    PayloadSealed(Address),

    #[error("description for {0} was already set")]
    DescriptionAlreadySet(Address),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Where in the pipeline a failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A node's own setup failed.
    Build,
    /// Aggregated from failed children during build.
    ChildBuild,
    /// A before/run/after hook failed.
    RunPhase,
    /// Aggregated from failed children during run.
    ChildRun,
    /// The producer or the consumer pipeline itself broke.
    FatalMediator,
}

impl TaskTreeError {
    /// Classify this error. Build and run trees are classified by their top
    /// node: one carrying messages failed on its own, one carrying only
    /// children failed because of them.
    pub fn kind(&self) -> FailureKind {
        match self {
            TaskTreeError::Build(tree) if tree.is_own_failure() => FailureKind::Build,
            TaskTreeError::Build(_) => FailureKind::ChildBuild,
            TaskTreeError::Run(tree) if tree.is_own_failure() => FailureKind::RunPhase,
            TaskTreeError::Run(_) => FailureKind::ChildRun,
            _ => FailureKind::FatalMediator,
        }
    }

    /// The error tree carried by a build or run failure.
    pub fn error_tree(&self) -> Option<&ErrorTree> {
        match self {
            TaskTreeError::Build(tree) | TaskTreeError::Run(tree) => Some(tree),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskTreeError>;

/// Text describing why a spawned task did not return.
///
/// Panics carry their payload text so that a panicking hook reads the same
/// as one returning an error.
pub(crate) fn join_failure_message(err: JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        if let Some(s) = payload.downcast_ref::<&str>() {
            return (*s).to_string();
        }
        if let Some(s) = payload.downcast_ref::<String>() {
            return s.clone();
        }
        return "task panicked".to_string();
    }
    err.to_string()
}

/// Flatten the result of a spawned fallible task into a failure message.
pub(crate) fn settle(
    joined: std::result::Result<anyhow::Result<()>, JoinError>,
) -> std::result::Result<(), String> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(format!("{err:#}")),
        Err(err) => Err(join_failure_message(err)),
    }
}
