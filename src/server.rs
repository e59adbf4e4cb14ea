//! The accept loop.
//!
//! [`Server`] binds a listener, accepts connections and spawns one task per
//! connection running [`HttpConnection::process`]. Requests on different
//! connections run concurrently; nothing mutable is shared between them, the
//! handler tree is behind an `Arc` and every request gets its own capture.

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::connection::HttpConnection;
use crate::handler::Handler;
use crate::recover::install_panic_hook;

/// Builder for [`Server`].
#[derive(Default)]
pub struct ServerBuilder {
    handler: Option<Arc<dyn Handler>>,
    address: Option<Vec<SocketAddr>>,
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder").field("address", &self.address).finish_non_exhaustive()
    }
}

impl ServerBuilder {
    fn new() -> Self {
        Default::default()
    }

    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        self.address = address.to_socket_addrs().map(Iterator::collect).ok();
        self
    }

    /// Sets the root handler; compose the recovery wrapper around it before
    /// passing it in.
    pub fn handler(mut self, handler: impl Handler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let handler = self.handler.ok_or(ServerBuildError::MissingHandler)?;
        let address = self.address.ok_or(ServerBuildError::MissingAddress)?;
        Ok(Server { handler, address })
    }
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("handler must be set")]
    MissingHandler,
    #[error("address must be set and resolvable")]
    MissingAddress,
}

/// A panic-isolating HTTP/1.1 server.
pub struct Server {
    handler: Arc<dyn Handler>,
    address: Vec<SocketAddr>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server").field("address", &self.address).finish_non_exhaustive()
    }
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Runs the accept loop; never returns under normal operation.
    pub async fn start(self) {
        install_panic_hook();

        info!("start listening at {:?}", self.address);
        let tcp_listener = match TcpListener::bind(self.address.as_slice()).await {
            Ok(tcp_listener) => tcp_listener,
            Err(e) => {
                error!(cause = %e, "bind server error");
                return;
            }
        };

        loop {
            let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let handler = Arc::clone(&self.handler);

            tokio::spawn(async move {
                let (reader, writer) = tcp_stream.into_split();
                let connection = HttpConnection::new(reader, writer);
                match connection.process(handler).await {
                    Ok(()) => {
                        info!("finished process, connection shutdown");
                    }
                    Err(e) => {
                        error!("service has error, cause {}, connection shutdown", e);
                    }
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::capture::ResponseCapture;
    use crate::protocol::RequestHeader;

    struct Noop;

    #[async_trait]
    impl Handler for Noop {
        async fn handle(&self, _request: &RequestHeader, _response: &mut ResponseCapture) {}
    }

    #[test]
    fn build_requires_handler() {
        let error = Server::builder().address("127.0.0.1:3000").build();
        assert!(matches!(error, Err(ServerBuildError::MissingHandler)));
    }

    #[test]
    fn build_requires_address() {
        let error = Server::builder().handler(Noop).build();
        assert!(matches!(error, Err(ServerBuildError::MissingAddress)));
    }

    #[test]
    fn build_with_handler_and_address() {
        let server = Server::builder().address("127.0.0.1:3000").handler(Noop).build();
        assert!(server.is_ok());
    }
}
