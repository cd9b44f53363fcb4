// src/exec/mod.rs

//! Run-phase execution.
//!
//! - [`sink`] defines the shared [`MessageSink`] emitter and the per-node
//!   [`NodeLog`] that hooks receive.
//! - [`runner`] executes a built task tree.

pub mod runner;
pub mod sink;

pub use runner::{RunOutcome, run};
pub use sink::{Emitter, MessageSink, NodeLog};
