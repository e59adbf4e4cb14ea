//! The panic recovery wrapper.
//!
//! [`CatchPanic`] decorates any [`Handler`] with a guarded scope: the inner
//! handler runs under `catch_unwind`, and a panic raised anywhere inside it
//! is converted into an HTTP 500 response instead of unwinding into the
//! connection task. Recovery is terminal for the request only, nothing is
//! re-raised and the process keeps serving.
//!
//! On a panic the wrapper:
//!
//! 1. builds a [`PanicReport`] from the panic payload and the backtrace the
//!    panic hook captured at the panic site
//! 2. logs the failure value and the backtrace as two plain-text records
//! 3. resets the response capture, discarding any partial output the handler
//!    wrote before failing
//! 4. writes the error response selected by [`RecoveryMode`]
//!
//! [`RecoveryMode::Verbose`] renders the panic value and the formatted
//! backtrace into the response body. That leaks internals to the client and
//! is only acceptable on development deployments;
//! [`RecoveryMode::Generic`] answers with an opaque body.

mod hook;
pub use hook::install_panic_hook;

use std::any::Any;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use http::{HeaderValue, StatusCode, header};
use tracing::error;

use crate::capture::ResponseCapture;
use crate::handler::{Handler, Wrapper};
use crate::protocol::RequestHeader;

/// Error body sent when failure detail is withheld.
const GENERIC_ERROR_BODY: &str = "Something went wrong";

/// Selects what a recovered 500 response reveals.
///
/// Chosen once at process startup and passed into the wrapper constructor;
/// there is no ambient global toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryMode {
    /// Render the panic value and backtrace into the response body.
    /// Development only.
    Verbose,
    /// Answer with an opaque generic error body.
    Generic,
}

/// A [`Wrapper`] producing [`CatchPanic`] handlers.
#[derive(Debug, Clone, Copy)]
pub struct CatchPanicWrapper {
    mode: RecoveryMode,
}

impl CatchPanicWrapper {
    pub fn new(mode: RecoveryMode) -> Self {
        Self { mode }
    }
}

impl<H: Handler> Wrapper<H> for CatchPanicWrapper {
    type Out = CatchPanic<H>;

    fn wrap(&self, handler: H) -> Self::Out {
        CatchPanic::new(handler, self.mode)
    }
}

/// A handler decorator that contains panics raised by its inner handler.
#[derive(Debug)]
pub struct CatchPanic<H> {
    inner: H,
    mode: RecoveryMode,
}

impl<H> CatchPanic<H> {
    pub fn new(inner: H, mode: RecoveryMode) -> Self {
        Self { inner, mode }
    }
}

#[async_trait]
impl<H: Handler> Handler for CatchPanic<H> {
    async fn handle(&self, request: &RequestHeader, response: &mut ResponseCapture) {
        // AssertUnwindSafe: on unwind the capture may hold partial writes,
        // which is exactly the state reset() discards below.
        let result = AssertUnwindSafe(self.inner.handle(request, response)).catch_unwind().await;

        let Err(payload) = result else {
            return;
        };

        let report = PanicReport::from_payload(payload);
        error!("handler panicked: {}", report.message());
        error!("panic backtrace:\n{}", report.backtrace());

        response.reset();
        response.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        match self.mode {
            RecoveryMode::Generic => {
                response.insert_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
                response.write(GENERIC_ERROR_BODY);
            }
            RecoveryMode::Verbose => {
                response.insert_header(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
                response.write(format!("<h1>panic: {}</h1><pre>{}</pre>", report.message(), report.backtrace()));
            }
        }
    }
}

/// A recovered failure: the panic value rendered to text plus the stack
/// trace snapshot taken at the panic site.
///
/// Exists only while recovery runs; it is logged, optionally rendered into
/// the verbose response body, and dropped.
#[derive(Debug)]
pub struct PanicReport {
    message: String,
    backtrace: String,
}

impl PanicReport {
    /// Builds a report from a `catch_unwind` payload, attaching the backtrace
    /// the panic hook captured on this thread, if any.
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = panic_message(payload.as_ref());
        let backtrace = hook::take_captured_backtrace().map(|b| b.to_string()).unwrap_or_default();
        Self { message, backtrace }
    }

    /// The panic value rendered to text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The formatted stack trace, empty if the hook was not installed.
    pub fn backtrace(&self) -> &str {
        &self.backtrace
    }
}

/// Renders a panic payload to text.
///
/// `panic!` with a string literal carries `&str`; `panic!` with a format
/// string carries `String`. Anything else is opaque.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
