use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Encoder;

use crate::codec::ResponseEncoder;
use crate::protocol::{Message, PayloadSize, ResponseHead, SendError};

/// Initial capacity of the staging buffer
const INIT_BUFFER_SIZE: usize = 4 * 1024;

/// Encodes response messages into a staging buffer and flushes them to the
/// write half of the connection.
///
/// Encoding is synchronous and infallible at the IO level; the only place a
/// transmission failure can surface is [`MessageWriter::flush`], which is why
/// commit reports the first failure it sees there.
#[derive(Debug)]
pub struct MessageWriter<W> {
    writer: W,
    buffer: BytesMut,
    encoder: ResponseEncoder,
}

impl<W> MessageWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W) -> Self {
        Self { writer, buffer: BytesMut::with_capacity(INIT_BUFFER_SIZE), encoder: ResponseEncoder::new() }
    }

    /// Encodes a message into the staging buffer.
    #[inline]
    pub fn write(&mut self, item: Message<(ResponseHead, PayloadSize)>) -> Result<(), SendError> {
        self.encoder.encode(item, &mut self.buffer)
    }

    /// Writes the staged bytes to the underlying channel and flushes it.
    pub async fn flush(&mut self) -> Result<(), SendError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let staged = self.buffer.split();
        self.writer.write_all(&staged).await?;
        Ok(self.writer.flush().await?)
    }
}
