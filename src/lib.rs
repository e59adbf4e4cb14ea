//! A panic-isolating micro HTTP/1.1 server
//!
//! This crate provides a small HTTP/1.1 request pipeline built on tokio whose
//! single purpose is fault isolation: a handler that panics must never take
//! the serving process down, leak a partial body, or leave the client with a
//! misleading success status. It stays intentionally small, there is no
//! routing framework and no business logic beyond a few demo handlers.
//!
//! # Architecture
//!
//! Two pieces cooperate per request:
//!
//! - [`ResponseCapture`](capture::ResponseCapture): handlers write their
//!   status code, headers and body chunks into an in-memory capture. Nothing
//!   reaches the socket until the connection commits the capture, so output
//!   written before a failure can simply be dropped.
//! - [`CatchPanic`](recover::CatchPanic): a decorator around any
//!   [`Handler`](handler::Handler) that runs the inner handler under
//!   `catch_unwind`, logs the panic value and the stack trace captured at the
//!   panic site, resets the capture and replaces it with an HTTP 500 error
//!   response. Depending on [`RecoveryMode`](recover::RecoveryMode) the error
//!   body is either an opaque generic message or the panic detail rendered as
//!   HTML for development use.
//!
//! The surrounding plumbing (request decoding, response encoding, the
//! keep-alive connection loop, prefix routing and the accept loop) follows
//! the usual tokio codec layering and is glue, not core.
//!
//! # Example
//!
//! ```no_run
//! use async_trait::async_trait;
//! use bulkhead::capture::ResponseCapture;
//! use bulkhead::handler::{Handler, Wrapper};
//! use bulkhead::protocol::RequestHeader;
//! use bulkhead::recover::{CatchPanicWrapper, RecoveryMode};
//! use bulkhead::router::Router;
//! use bulkhead::server::Server;
//!
//! struct Hello;
//!
//! #[async_trait]
//! impl Handler for Hello {
//!     async fn handle(&self, _request: &RequestHeader, response: &mut ResponseCapture) {
//!         response.write("<h1>Hello!</h1>\n");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = Router::builder().default_handler(Hello).build();
//!     let handler = CatchPanicWrapper::new(RecoveryMode::Generic).wrap(router);
//!
//!     match Server::builder().address("0.0.0.0:3000").handler(handler).build() {
//!         Ok(server) => server.start().await,
//!         Err(e) => eprintln!("can't build server: {e}"),
//!     }
//! }
//! ```

pub mod capture;
pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;
pub mod recover;
pub mod router;
pub mod server;

mod utils;
