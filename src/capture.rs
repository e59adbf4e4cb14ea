//! The buffering response capturer.
//!
//! A [`ResponseCapture`] stands between handlers and the socket: status code,
//! headers and body chunks are recorded in memory and only transmitted when
//! the connection calls [`ResponseCapture::commit`]. Deferring the
//! irrevocable network write until the handler chain has completed is what
//! makes recovery possible, a panicking handler's partial output is simply
//! dropped and replaced before anything has gone on the wire.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use tokio::io::AsyncWrite;

use crate::connection::MessageWriter;
use crate::protocol::{Message, PayloadItem, PayloadSize, ResponseHead, SendError};

/// An in-memory capture of a response under construction.
///
/// One capture exists per request, owned by the connection and lent to the
/// handler chain; it never crosses a request boundary.
#[derive(Debug, Default)]
pub struct ResponseCapture {
    status: Option<StatusCode>,
    headers: HeaderMap,
    chunks: Vec<Bytes>,
}

impl ResponseCapture {
    /// Creates an empty capture.
    pub fn new() -> Self {
        Default::default()
    }

    /// Records the intended status code; does not transmit.
    ///
    /// May be called before or after body writes, the status line is always
    /// transmitted first on commit. The last recorded status wins.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    /// The recorded status code, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Records a response header; does not transmit.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Appends a body chunk to the capture; does not transmit.
    pub fn write(&mut self, chunk: impl Into<Bytes>) {
        let chunk = chunk.into();
        if !chunk.is_empty() {
            self.chunks.push(chunk);
        }
    }

    /// Total length of the buffered body in bytes.
    pub fn body_len(&self) -> u64 {
        self.chunks.iter().map(|chunk| chunk.len() as u64).sum()
    }

    /// Returns true if nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.headers.is_empty() && self.chunks.is_empty()
    }

    /// Drops the recorded status, headers and all buffered chunks.
    ///
    /// The recovery wrapper calls this to discard a panicking handler's
    /// partial output before writing the error response.
    pub fn reset(&mut self) {
        self.status = None;
        self.headers.clear();
        self.chunks.clear();
    }

    /// Transmits the capture: status line and headers first (status defaults
    /// to 200, Content-Length is the total buffered length), then each chunk
    /// in original write order, then flushes the underlying channel.
    ///
    /// Returns the first transmission failure encountered; the caller decides
    /// what to do with the connection.
    pub async fn commit<W>(self, writer: &mut MessageWriter<W>) -> Result<(), SendError>
    where
        W: AsyncWrite + Unpin,
    {
        let payload_size = PayloadSize::from(self.body_len());

        let mut head = ResponseHead::new(());
        *head.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *head.headers_mut() = self.headers;

        writer.write(Message::Header((head, payload_size)))?;
        for chunk in self.chunks {
            writer.write(Message::Payload(PayloadItem::Chunk(chunk)))?;
        }
        writer.write(Message::Payload(PayloadItem::Eof))?;

        writer.flush().await
    }
}
