// src/render/mod.rs

//! Reference presentation adapters built on the public interfaces.
//!
//! - [`console`] renders progress as coloured bullets and walks error trees.
//! - [`file`] persists every message as a JSON line.
//! - [`replay`] feeds such a log back through a mediator.

pub mod console;
pub mod file;
pub mod replay;

pub use console::{BulletedConsole, print_error_json, walk_error};
pub use file::JsonLinesSink;
pub use replay::replay;
