use bytes::Bytes;

/// A framing item on the wire: either a head of type `T` or a piece of body.
///
/// The same shape is used on both sides: the request decoder produces
/// `Message<(RequestHeader, PayloadSize)>`, the response encoder consumes
/// `Message<(ResponseHead, PayloadSize)>`.
#[derive(Debug)]
pub enum Message<T> {
    /// The head of the message
    Header(T),
    /// A chunk of body data or the EOF marker
    Payload(PayloadItem),
}

/// An item in the body stream: a data chunk or the end of the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem {
    /// A chunk of body data
    Chunk(Bytes),
    /// Marks the end of the body
    Eof,
}

/// Size information of a message body.
///
/// There is no chunked variant; bodies either have a known length or are
/// absent.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Body with known length in bytes
    Length(u64),
    /// No body
    Empty,
}

impl PayloadSize {
    /// Returns true if there is no body.
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }

    /// The body length in bytes.
    #[inline]
    pub fn len(&self) -> u64 {
        match self {
            PayloadSize::Length(n) => *n,
            PayloadSize::Empty => 0,
        }
    }
}

impl From<u64> for PayloadSize {
    fn from(len: u64) -> Self {
        if len == 0 { PayloadSize::Empty } else { PayloadSize::Length(len) }
    }
}

impl<T> Message<T> {
    /// Returns true if this message is a body item.
    #[inline]
    pub fn is_payload(&self) -> bool {
        matches!(self, Message::Payload(_))
    }

    /// Returns true if this message is a head.
    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self, Message::Header(_))
    }
}

impl PayloadItem {
    /// Returns true if this item marks the end of the body.
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    /// Returns the contained bytes if this is a chunk.
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}
