use std::io;
use std::sync::Arc;

use futures::StreamExt;
use http::StatusCode;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::FramedRead;
use tracing::{error, info};

use crate::capture::ResponseCapture;
use crate::codec::RequestDecoder;
use crate::connection::MessageWriter;
use crate::handler::Handler;
use crate::protocol::{HttpError, Message, ParseError, PayloadItem};

/// A single HTTP/1.1 connection.
///
/// Runs the keep-alive request loop: decode the request head, drain the
/// request body, let the handler chain write into a fresh
/// [`ResponseCapture`], commit the capture, repeat. The capture is the only
/// path to the socket, so nothing a handler does reaches the client before
/// the chain has returned.
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    message_writer: MessageWriter<W>,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), 8 * 1024),
            message_writer: MessageWriter::new(writer),
        }
    }

    /// Serves requests until the peer closes, the request asks to close, or
    /// an error ends the connection.
    ///
    /// Parse failures answer 400 and close. Transmission failures propagate;
    /// they are not swallowed.
    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler + ?Sized,
    {
        loop {
            let header = match self.framed_read.next().await {
                Some(Ok(Message::Header((header, _payload_size)))) => header,

                Some(Ok(Message::Payload(_))) => {
                    error!("received body item while expecting a request head");
                    self.send_error_response(StatusCode::BAD_REQUEST).await?;
                    return Err(ParseError::invalid_header("body item while expecting a request head").into());
                }

                Some(Err(e)) => {
                    error!("can't parse request, cause {}", e);
                    self.send_error_response(StatusCode::BAD_REQUEST).await?;
                    return Err(e.into());
                }

                None => {
                    info!("connection closed by peer");
                    return Ok(());
                }
            };

            // nothing in this pipeline consumes request bodies
            self.drain_request_body().await?;

            let keep_alive = header.keep_alive();

            let mut capture = ResponseCapture::new();
            handler.handle(&header, &mut capture).await;
            capture.commit(&mut self.message_writer).await?;

            if !keep_alive {
                info!("request asked to close the connection");
                return Ok(());
            }
        }
    }

    async fn drain_request_body(&mut self) -> Result<(), HttpError> {
        loop {
            match self.framed_read.next().await {
                Some(Ok(Message::Payload(PayloadItem::Eof))) => return Ok(()),
                Some(Ok(Message::Payload(PayloadItem::Chunk(_)))) => continue,
                Some(Ok(Message::Header(_))) => {
                    return Err(ParseError::invalid_header("request head while draining body").into());
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Err(ParseError::io(io::Error::from(io::ErrorKind::UnexpectedEof)).into()),
            }
        }
    }

    async fn send_error_response(&mut self, status: StatusCode) -> Result<(), HttpError> {
        let mut capture = ResponseCapture::new();
        capture.set_status(status);
        Ok(capture.commit(&mut self.message_writer).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

    use crate::protocol::RequestHeader;
    use crate::recover::{CatchPanic, RecoveryMode};

    struct Hello;

    #[async_trait]
    impl Handler for Hello {
        async fn handle(&self, _request: &RequestHeader, response: &mut ResponseCapture) {
            response.write("<h1>Hello!</h1>\n");
        }
    }

    struct PanicDemo;

    #[async_trait]
    impl Handler for PanicDemo {
        async fn handle(&self, _request: &RequestHeader, _response: &mut ResponseCapture) {
            panic!("OHHHHH");
        }
    }

    struct PanicAfterDemo;

    #[async_trait]
    impl Handler for PanicAfterDemo {
        async fn handle(&self, _request: &RequestHeader, response: &mut ResponseCapture) {
            response.write("<h1>Hello!</h1>");
            panic!("OHHHHH");
        }
    }

    struct EchoPath;

    #[async_trait]
    impl Handler for EchoPath {
        async fn handle(&self, request: &RequestHeader, response: &mut ResponseCapture) {
            response.write(request.uri().path().to_owned());
        }
    }

    /// Sends raw request bytes through an in-memory transport and returns the
    /// raw response bytes.
    async fn roundtrip<H: Handler + 'static>(handler: Arc<H>, request: &str) -> String {
        let (mut client, server) = duplex(16 * 1024);
        let (reader, writer) = tokio::io::split(server);
        let connection = HttpConnection::new(reader, writer);

        let server_task = tokio::spawn(async move { connection.process(handler).await });

        client.write_all(request.as_bytes()).await.unwrap();
        client.shutdown().await.unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();

        server_task.await.unwrap().unwrap();
        String::from_utf8(response).unwrap()
    }

    #[tokio::test]
    async fn healthy_route_returns_what_the_handler_wrote() {
        let response = roundtrip(Arc::new(Hello), "GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await;

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("content-length: 16\r\n"));
        assert!(response.ends_with("\r\n\r\n<h1>Hello!</h1>\n"));
    }

    #[tokio::test]
    async fn panicking_route_answers_exactly_one_500() {
        let handler = Arc::new(CatchPanic::new(PanicDemo, RecoveryMode::Generic));
        let response =
            roundtrip(handler, "GET /panic/x HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await;

        assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(response.ends_with("\r\n\r\nSomething went wrong"));
        assert_eq!(response.matches("HTTP/1.1").count(), 1);
    }

    #[tokio::test]
    async fn partial_write_then_panic_does_not_leak_success() {
        let handler = Arc::new(CatchPanic::new(PanicAfterDemo, RecoveryMode::Generic));
        let response =
            roundtrip(handler, "GET /panic-after/x HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await;

        assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(!response.contains("<h1>Hello!</h1>"));
        assert!(response.ends_with("\r\n\r\nSomething went wrong"));
    }

    #[tokio::test]
    async fn keep_alive_serves_multiple_requests() {
        let request = "GET /first HTTP/1.1\r\nHost: localhost\r\n\r\n\
                       GET /second HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n";
        let response = roundtrip(Arc::new(EchoPath), request).await;

        assert_eq!(response.matches("HTTP/1.1 200 OK").count(), 2);
        assert!(response.contains("/first"));
        assert!(response.contains("/second"));
    }

    #[tokio::test]
    async fn request_body_is_drained_before_the_next_request() {
        let request = "POST /submit HTTP/1.1\r\nHost: localhost\r\nContent-Length: 4\r\n\r\nbody\
                       GET /after HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n";
        let response = roundtrip(Arc::new(EchoPath), request).await;

        assert_eq!(response.matches("HTTP/1.1 200 OK").count(), 2);
        assert!(response.contains("/submit"));
        assert!(response.contains("/after"));
    }

    #[tokio::test]
    async fn malformed_request_answers_400_and_closes() {
        let (mut client, server) = duplex(16 * 1024);
        let (reader, writer) = tokio::io::split(server);
        let connection = HttpConnection::new(reader, writer);

        let server_task = tokio::spawn(async move { connection.process(Arc::new(Hello)).await });

        client.write_all(b"NOT AN HTTP REQUEST AT ALL\r\n\r\n").await.unwrap();
        client.shutdown().await.unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        let response = String::from_utf8(response).unwrap();

        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(server_task.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn concurrent_panicking_and_healthy_requests_do_not_interact() {
        let panicking = Arc::new(CatchPanic::new(PanicDemo, RecoveryMode::Generic));
        let healthy = Arc::new(CatchPanic::new(Hello, RecoveryMode::Generic));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let panicking = Arc::clone(&panicking);
            let healthy = Arc::clone(&healthy);
            tasks.push(tokio::spawn(async move {
                roundtrip(panicking, "GET /panic/x HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await
            }));
            tasks.push(tokio::spawn(async move {
                roundtrip(healthy, "GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await
            }));
        }

        for (i, task) in tasks.into_iter().enumerate() {
            let response = task.await.unwrap();
            if i % 2 == 0 {
                assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
            } else {
                assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
            }
        }
    }
}
