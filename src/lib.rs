// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod mediator;
pub mod message;
pub mod progress;
pub mod render;
pub mod tree;
pub mod types;

use std::future::Future;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::{ConsoleSettings, Settings, default_config_path, load_or_default};
use crate::errors::{Result, TaskTreeError};
use crate::exec::Emitter;
use crate::mediator::{Consumer, Logger, Mediator};
use crate::message::Message;
use crate::render::{BulletedConsole, JsonLinesSink, print_error_json, walk_error};
use crate::tree::{ErrorTree, Payload};

pub use crate::progress::ProgressTree;
pub use crate::render::replay;
pub use crate::tree::{ShapeDescriptor, TaskNode};
pub use crate::types::{Address, Code, Severity};

/// Build the task tree described by `setup`, then start running it.
///
/// On a successful build this emits the tree's shape to `emitter`, starts
/// the run in the background and returns the [`Logger`] whose
/// [`finished`](Logger::finished) resolves with the run's outcome. A failed
/// build returns [`TaskTreeError::Build`] and nothing is emitted.
pub async fn process_tree<F, Fut>(emitter: Emitter, setup: F) -> Result<Logger>
where
    F: FnOnce(Payload) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let root = tree::build(setup).await.map_err(TaskTreeError::Build)?;
    info!(nodes = root.shape().node_count(), "task tree built; starting run");

    let mut logger = Logger::new(emitter, root.shape());
    let run_emitter = logger.emitter();
    logger.store_process(exec::run(root, run_emitter));
    Ok(logger)
}

/// Build and run a task tree, feeding its messages to `consumer`.
///
/// Resolves when the root completes, or with the first terminal failure:
/// a build error, a run error, or the consumer's own error. A consumer
/// failure stops the waiting but not the run itself.
pub async fn run_with_consumer<C, F, Fut>(consumer: C, setup: F) -> Result<()>
where
    C: Consumer,
    F: FnOnce(Payload) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let mediator = Mediator::new(consumer);
    let logger = process_tree(mediator.emitter(), setup).await?;

    mediator.outcome().await?;
    logger.finished().await
}

/// Build and run a task tree with bulleted progress on stdout.
///
/// Failures are printed as the error tree's full JSON followed by an
/// indented walk of the tree, then returned.
pub async fn run_to_console<F, Fut>(settings: &ConsoleSettings, setup: F) -> Result<()>
where
    F: FnOnce(Payload) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let console = BulletedConsole::stdout(settings.clone())?;
    let result = run_with_consumer(console, setup).await;

    if let Err(err) = &result {
        print_failure(err, settings.color, &mut io::stdout())?;
    }
    result
}

/// Build and run a task tree, appending every message to `path` as JSON
/// lines. A build failure is appended as a `fatal` line.
pub async fn run_to_file<F, Fut>(path: impl AsRef<Path>, setup: F) -> Result<()>
where
    F: FnOnce(Payload) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let sink: Emitter = Arc::new(JsonLinesSink::create(path)?);

    match process_tree(Arc::clone(&sink), setup).await {
        Ok(logger) => logger.finished().await,
        Err(TaskTreeError::Build(tree)) => {
            sink.emit(Message::fatal(TaskTreeError::Build(tree.clone())));
            Err(TaskTreeError::Build(tree))
        }
        Err(err) => Err(err),
    }
}

/// Run to the configured log file if there is one, to the console otherwise.
pub async fn run_with_settings<F, Fut>(settings: &Settings, setup: F) -> Result<()>
where
    F: FnOnce(Payload) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    match &settings.output.log_file {
        Some(path) => run_to_file(path, setup).await,
        None => run_to_console(&settings.console, setup).await,
    }
}

/// Print a failure the way the console adapter reports it.
pub fn print_failure(err: &TaskTreeError, color: bool, out: &mut dyn Write) -> io::Result<()> {
    match err.error_tree() {
        Some(tree) => {
            print_error_json(tree, color, out)?;
            walk_error(tree, color, out)
        }
        None => walk_error(&ErrorTree::leaf(None, err.to_string()), color, out),
    }
}

/// High-level entry point used by `main.rs`.
pub async fn run_cli(args: CliArgs) -> anyhow::Result<()> {
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let settings = load_or_default(&config_path)
        .with_context(|| format!("loading settings from {:?}", config_path))?;
    debug!(?settings, "settings loaded");

    match args.command {
        Command::Replay { log, no_color } => {
            let mut console = settings.console.clone();
            console.color = console.color && !no_color;
            let color = console.color;

            let consumer = BulletedConsole::stdout(console)?;
            match render::replay(&log, consumer).await {
                Ok(count) => {
                    info!(messages = count, "replay complete");
                    Ok(())
                }
                Err(err) => {
                    print_failure(&err, color, &mut io::stdout())?;
                    Err(err).with_context(|| format!("replaying {:?}", log))
                }
            }
        }
        Command::CheckConfig => {
            println!("tasktree settings ({:?})", config_path);
            println!("  console.color = {}", settings.console.color);
            println!("  console.show_fraction = {}", settings.console.show_fraction);
            match &settings.output.log_file {
                Some(path) => println!("  output.log_file = {:?}", path),
                None => println!("  output.log_file = (console)"),
            }
            Ok(())
        }
    }
}
