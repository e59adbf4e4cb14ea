//! Request handler abstractions.
//!
//! A [`Handler`] receives the parsed request head and a mutable
//! [`ResponseCapture`] to write into. Handlers are infallible by type: their
//! failure mode is panicking, which the recovery wrapper in
//! [`crate::recover`] converts into an error response.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Future;

use crate::capture::ResponseCapture;
use crate::protocol::RequestHeader;

/// An asynchronous request handler.
///
/// Object safe, so routers and wrappers can hold `Box<dyn Handler>`.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: &RequestHeader, response: &mut ResponseCapture);
}

/// A handler that wraps another handler.
///
/// This is the decorator seam of the pipeline: a wrapper consumes a handler
/// and produces a new one with additional behavior around the inner call.
pub trait Wrapper<H> {
    /// The wrapper's output handler type
    type Out;

    /// Wraps the handler into another handler.
    fn wrap(&self, handler: H) -> Self::Out;
}

/// A closure-based [`Handler`], see [`handler_fn`].
#[derive(Debug)]
pub struct FnHandler<F> {
    f: F,
}

/// Lifts a closure returning a boxed future into a [`Handler`].
///
/// Mostly useful in tests; real handlers are usually small structs.
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: for<'a> Fn(&'a RequestHeader, &'a mut ResponseCapture) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>
        + Send
        + Sync,
{
    FnHandler { f }
}

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: for<'a> Fn(&'a RequestHeader, &'a mut ResponseCapture) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>
        + Send
        + Sync,
{
    async fn handle(&self, request: &RequestHeader, response: &mut ResponseCapture) {
        (self.f)(request, response).await;
    }
}
