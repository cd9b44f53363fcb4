// src/tree/mod.rs

//! Task tree construction.
//!
//! - [`payload`] is the capability handle a setup callback uses to describe
//!   its node, register hooks and add children.
//! - [`builder`] runs the setup callbacks and freezes the result into
//!   [`TaskNode`]s, or aggregates failures into an [`ErrorTree`].
//! - [`shape`] is the hook-free view of a built tree.
//! - [`error_tree`] is the failure report shared with the runner.

pub mod builder;
pub mod error_tree;
pub mod node;
pub mod payload;
pub mod shape;

pub use builder::{BuildOutcome, Setup, build};
pub use error_tree::ErrorTree;
pub use node::{Hook, Hooks, StepFuture, TaskNode};
pub use payload::Payload;
pub use shape::ShapeDescriptor;
