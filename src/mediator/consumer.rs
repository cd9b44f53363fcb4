// src/mediator/consumer.rs

//! Pluggable message consumer.
//!
//! The mediator hands every node message, together with the up-to-date
//! progress tree, to a `Consumer`. Presentation adapters (the bulleted
//! console in [`crate::render`]) implement it; tests can supply their own
//! implementation that records what they were given.

use std::future::Future;
use std::pin::Pin;

use crate::message::Message;
use crate::progress::ProgressTree;

/// Future returned by [`Consumer::consume`].
pub type ConsumeFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// Asynchronous receiver of the message stream.
///
/// Messages arrive one at a time, in emission order; the next message is not
/// delivered until the previous call's future has settled. Returning an
/// error fails the whole mediator.
pub trait Consumer: Send + 'static {
    fn consume<'a>(&'a mut self, tree: &'a ProgressTree, message: &'a Message)
    -> ConsumeFuture<'a>;
}

/// Plain synchronous closures are consumers too.
impl<F> Consumer for F
where
    F: FnMut(&ProgressTree, &Message) -> anyhow::Result<()> + Send + 'static,
{
    fn consume<'a>(
        &'a mut self,
        tree: &'a ProgressTree,
        message: &'a Message,
    ) -> ConsumeFuture<'a> {
        let result = self(tree, message);
        Box::pin(async move { result })
    }
}
