//! Demo deployment: a greeting route plus two routes that panic, served
//! behind the recovery wrapper on port 3000.

use async_trait::async_trait;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use bulkhead::capture::ResponseCapture;
use bulkhead::handler::{Handler, Wrapper};
use bulkhead::protocol::RequestHeader;
use bulkhead::recover::{CatchPanicWrapper, RecoveryMode};
use bulkhead::router::Router;
use bulkhead::server::Server;

/// Startup-time recovery policy. Verbose leaks panic detail and stack traces
/// into responses; switch to `Generic` for anything production-facing.
const RECOVERY_MODE: RecoveryMode = RecoveryMode::Verbose;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
        return;
    }

    let router = Router::builder()
        .route("/panic/", PanicDemo)
        .route("/panic-after/", PanicAfterDemo)
        .default_handler(Hello)
        .build();

    let handler = CatchPanicWrapper::new(RECOVERY_MODE).wrap(router);

    match Server::builder().address("0.0.0.0:3000").handler(handler).build() {
        Ok(server) => server.start().await,
        Err(e) => error!(cause = %e, "can't build server"),
    }
}

/// Default route: a static greeting.
struct Hello;

#[async_trait]
impl Handler for Hello {
    async fn handle(&self, request: &RequestHeader, response: &mut ResponseCapture) {
        info!("request path {}", request.uri().path());
        response.write("<h1>Hello!</h1>\n");
    }
}

/// Panics before writing anything, exercising recovery with no prior output.
struct PanicDemo;

#[async_trait]
impl Handler for PanicDemo {
    async fn handle(&self, _request: &RequestHeader, _response: &mut ResponseCapture) {
        trigger_fault();
    }
}

/// Writes a partial success body, then panics, exercising
/// discard-of-partial-output.
struct PanicAfterDemo;

#[async_trait]
impl Handler for PanicAfterDemo {
    async fn handle(&self, _request: &RequestHeader, response: &mut ResponseCapture) {
        response.write("<h1>Hello!</h1>");
        trigger_fault();
    }
}

fn trigger_fault() {
    panic!("OHHHHH");
}
