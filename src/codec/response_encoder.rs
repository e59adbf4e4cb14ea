//! HTTP response encoder.
//!
//! Serializes a response head (status line plus headers, Content-Length
//! derived from the payload size) followed by raw body chunks. The encoder
//! tracks whether a head has been written so that body chunks without a head,
//! or a second head mid-body, are rejected instead of corrupting the stream.

use std::io;
use std::io::{ErrorKind, Write};

use bytes::{BufMut, BytesMut};
use http::{Version, header};
use tokio_util::codec::Encoder;
use tracing::error;

use crate::protocol::{Message, PayloadItem, PayloadSize, ResponseHead, SendError};

/// Initial buffer space reserved for head serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

/// Encoder for HTTP responses implementing the [`Encoder`] trait.
#[derive(Debug)]
pub struct ResponseEncoder {
    /// `None` while expecting a head, `Some(remaining)` while body bytes are
    /// still owed.
    payload_remaining: Option<u64>,
}

impl ResponseEncoder {
    /// Creates a new `ResponseEncoder`.
    pub fn new() -> Self {
        Default::default()
    }
}

impl Default for ResponseEncoder {
    fn default() -> Self {
        Self { payload_remaining: None }
    }
}

impl Encoder<Message<(ResponseHead, PayloadSize)>> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Message<(ResponseHead, PayloadSize)>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header((head, payload_size)) => {
                if self.payload_remaining.is_some() {
                    error!("expect payload item but receive response head");
                    return Err(SendError::invalid_state("response head while body is pending"));
                }

                encode_head(head, payload_size, dst)?;
                self.payload_remaining = Some(payload_size.len());
                Ok(())
            }

            Message::Payload(PayloadItem::Chunk(bytes)) => {
                let remaining = match &mut self.payload_remaining {
                    Some(remaining) => remaining,
                    None => {
                        error!("expect response head but receive payload item");
                        return Err(SendError::invalid_state("body chunk without response head"));
                    }
                };

                if bytes.len() as u64 > *remaining {
                    return Err(SendError::invalid_state("body chunk exceeds declared content-length"));
                }

                *remaining -= bytes.len() as u64;
                dst.extend_from_slice(&bytes);
                Ok(())
            }

            Message::Payload(PayloadItem::Eof) => {
                match self.payload_remaining.take() {
                    Some(0) | None => Ok(()),
                    Some(remaining) => {
                        Err(SendError::invalid_state(format!("body ended with {remaining} bytes still owed")))
                    }
                }
            }
        }
    }
}

/// Writes the status line, Content-Length and remaining headers.
fn encode_head(mut head: ResponseHead, payload_size: PayloadSize, dst: &mut BytesMut) -> Result<(), SendError> {
    dst.reserve(INIT_HEADER_SIZE);

    match head.version() {
        Version::HTTP_11 => {
            write!(
                FastWrite(dst),
                "HTTP/1.1 {} {}\r\n",
                head.status().as_str(),
                head.status().canonical_reason().unwrap_or("Unknown")
            )?;
        }
        v => {
            error!(http_version = ?v, "unsupported http version");
            return Err(io::Error::from(ErrorKind::Unsupported).into());
        }
    }

    let content_length = payload_size.len();
    match head.headers_mut().get_mut(header::CONTENT_LENGTH) {
        Some(value) => *value = content_length.into(),
        None => {
            head.headers_mut().insert(header::CONTENT_LENGTH, content_length.into());
        }
    }

    for (header_name, header_value) in head.headers().iter() {
        dst.put_slice(header_name.as_ref());
        dst.put_slice(b": ");
        dst.put_slice(header_value.as_ref());
        dst.put_slice(b"\r\n");
    }
    dst.put_slice(b"\r\n");
    Ok(())
}

/// Writer adapter over `BytesMut`; space is reserved up front so writes never
/// fail.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
