//! HTTP request decoder.
//!
//! Decoding happens in two phases driven by a small state machine:
//!
//! 1. Head parsing with `httparse`, producing a [`RequestHeader`] and the
//!    body size derived from Content-Length
//! 2. Body parsing, emitting [`PayloadItem::Chunk`]s until the declared
//!    length is consumed, then [`PayloadItem::Eof`]
//!
//! Chunked transfer encoding is rejected with
//! [`ParseError::UnsupportedTransferEncoding`].

use bytes::{Buf, BytesMut};
use http::{HeaderName, HeaderValue, Method, Request, Uri, Version, header};
use httparse::Status;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, RequestHeader};
use crate::utils::ensure;

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire head section
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// A decoder for HTTP requests handling both head and body.
///
/// The `body_decoder` field doubles as the state: `None` while parsing the
/// head, `Some` while the body of the current request is being consumed.
#[derive(Debug)]
pub struct RequestDecoder {
    body_decoder: Option<LengthDecoder>,
}

impl RequestDecoder {
    /// Creates a new `RequestDecoder`.
    pub fn new() -> Self {
        Default::default()
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self { body_decoder: None }
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<(RequestHeader, PayloadSize)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // body phase
        if let Some(body_decoder) = &mut self.body_decoder {
            let message = match body_decoder.decode(src) {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(item @ PayloadItem::Eof) => {
                    // this request's body is complete, back to head parsing
                    self.body_decoder.take();
                    Some(Message::Payload(item))
                }
                None => None,
            };

            return Ok(message);
        }

        // head phase
        let message = match decode_header(src)? {
            Some((header, payload_size)) => {
                self.body_decoder = Some(LengthDecoder::new(payload_size.len()));
                Some(Message::Header((header, payload_size)))
            }
            None => None,
        };

        Ok(message)
    }
}

/// Parses the request head from the buffer.
///
/// Returns `Ok(None)` if the buffer does not yet hold a complete head.
fn decode_header(src: &mut BytesMut) -> Result<Option<(RequestHeader, PayloadSize)>, ParseError> {
    // shortest possible request line: "GET / HTTP/1.1"
    if src.len() < 14 {
        return Ok(None);
    }

    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
    let mut parsed = httparse::Request::new(&mut headers);

    let status = parsed.parse(src).map_err(|e| match e {
        httparse::Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
        e => ParseError::invalid_header(e.to_string()),
    })?;

    let head_size = match status {
        Status::Complete(head_size) => head_size,
        Status::Partial => {
            ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
            return Ok(None);
        }
    };

    trace!(head_size, "parsed request head");
    ensure!(head_size <= MAX_HEADER_BYTES, ParseError::too_large_header(head_size, MAX_HEADER_BYTES));

    let version = match parsed.version {
        Some(0) => Version::HTTP_10,
        Some(1) => Version::HTTP_11,
        v => return Err(ParseError::InvalidVersion(v)),
    };

    let method = Method::from_bytes(parsed.method.ok_or(ParseError::InvalidMethod)?.as_bytes())
        .map_err(|_| ParseError::InvalidMethod)?;
    let uri: Uri = parsed.path.ok_or(ParseError::InvalidUri)?.parse().map_err(|_| ParseError::InvalidUri)?;

    let mut request = Request::new(());
    *request.method_mut() = method;
    *request.uri_mut() = uri;
    *request.version_mut() = version;

    let header_map = request.headers_mut();
    header_map.reserve(parsed.headers.len());
    for header in parsed.headers.iter() {
        let name =
            HeaderName::from_bytes(header.name.as_bytes()).map_err(|e| ParseError::invalid_header(e.to_string()))?;
        let value = HeaderValue::from_bytes(header.value).map_err(|e| ParseError::invalid_header(e.to_string()))?;
        header_map.append(name, value);
    }

    src.advance(head_size);

    let header = RequestHeader::from(request);
    let payload_size = parse_payload(&header)?;
    Ok(Some((header, payload_size)))
}

/// Determines the body size from the request headers.
///
/// Transfer-Encoding is rejected outright; only Content-Length framing is
/// supported.
fn parse_payload(header: &RequestHeader) -> Result<PayloadSize, ParseError> {
    if !header.need_body() {
        return Ok(PayloadSize::Empty);
    }

    if header.headers().get(header::TRANSFER_ENCODING).is_some() {
        return Err(ParseError::UnsupportedTransferEncoding);
    }

    match header.headers().get(header::CONTENT_LENGTH) {
        None => Ok(PayloadSize::Empty),
        Some(value) => {
            let value_str = value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;
            let length = value_str
                .trim()
                .parse::<u64>()
                .map_err(|_| ParseError::invalid_content_length(format!("value {value_str} is not u64")))?;
            Ok(PayloadSize::from(length))
        }
    }
}

/// Consumes a fixed-length body from the read buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LengthDecoder {
    remaining: u64,
}

impl LengthDecoder {
    fn new(remaining: u64) -> Self {
        Self { remaining }
    }

    fn decode(&mut self, src: &mut BytesMut) -> Option<PayloadItem> {
        if self.remaining == 0 {
            return Some(PayloadItem::Eof);
        }

        if src.is_empty() {
            return None;
        }

        let len = u64::min(self.remaining, src.len() as u64) as usize;
        let bytes = src.split_to(len).freeze();
        self.remaining -= len as u64;
        Some(PayloadItem::Chunk(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use indoc::indoc;

    fn decode_all(decoder: &mut RequestDecoder, buf: &mut BytesMut) -> Vec<Message<(RequestHeader, PayloadSize)>> {
        let mut messages = Vec::new();
        while let Some(message) = decoder.decode(buf).unwrap() {
            let is_eof = matches!(&message, Message::Payload(PayloadItem::Eof));
            messages.push(message);
            if is_eof {
                break;
            }
        }
        messages
    }

    #[test]
    fn from_curl() {
        let str = indoc! {"
        GET /index.html HTTP/1.1\r
        Host: 127.0.0.1:3000\r
        User-Agent: curl/7.79.1\r
        Accept: */*\r
        \r
        "};

        let mut buf = BytesMut::from(str);
        let mut decoder = RequestDecoder::new();

        let messages = decode_all(&mut decoder, &mut buf);
        assert_eq!(messages.len(), 2);

        let Message::Header((header, payload_size)) = &messages[0] else {
            panic!("expected head message");
        };
        assert!(payload_size.is_empty());
        assert_eq!(header.method(), &Method::GET);
        assert_eq!(header.version(), Version::HTTP_11);
        assert_eq!(header.uri().path(), "/index.html");
        assert_eq!(header.headers().len(), 3);
        assert_eq!(header.headers().get(header::HOST), Some(&HeaderValue::from_static("127.0.0.1:3000")));

        assert!(messages[1].is_payload());
        assert!(buf.is_empty());
    }

    #[test]
    fn partial_head_needs_more_data() {
        let mut buf = BytesMut::from("GET /index.html HTTP/1.1\r\nHost: 127");
        let mut decoder = RequestDecoder::new();
        assert!(decoder.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b".0.0.1\r\n\r\n");
        assert!(decoder.decode(&mut buf).unwrap().is_some());
    }

    #[test]
    fn body_with_content_length() {
        let str = indoc! {"
        POST /submit HTTP/1.1\r
        Host: localhost\r
        Content-Length: 5\r
        \r
        hello"};

        let mut buf = BytesMut::from(str);
        let mut decoder = RequestDecoder::new();

        let Message::Header((_, payload_size)) = decoder.decode(&mut buf).unwrap().unwrap() else {
            panic!("expected head message");
        };
        assert_eq!(payload_size, PayloadSize::Length(5));

        let Message::Payload(PayloadItem::Chunk(chunk)) = decoder.decode(&mut buf).unwrap().unwrap() else {
            panic!("expected body chunk");
        };
        assert_eq!(&chunk[..], b"hello");

        let Message::Payload(item) = decoder.decode(&mut buf).unwrap().unwrap() else {
            panic!("expected eof");
        };
        assert!(item.is_eof());
    }

    #[test]
    fn two_pipelined_requests() {
        let mut buf = BytesMut::from("GET /a HTTP/1.1\r\nHost: x\r\n\r\nGET /b HTTP/1.1\r\nHost: x\r\n\r\n");
        let mut decoder = RequestDecoder::new();

        let messages = decode_all(&mut decoder, &mut buf);
        assert_eq!(messages.len(), 2);
        let messages = decode_all(&mut decoder, &mut buf);
        assert_eq!(messages.len(), 2);

        let Message::Header((header, _)) = &messages[0] else {
            panic!("expected head message");
        };
        assert_eq!(header.uri().path(), "/b");
    }

    #[test]
    fn chunked_transfer_encoding_is_rejected() {
        let str = indoc! {"
        POST /submit HTTP/1.1\r
        Host: localhost\r
        Transfer-Encoding: chunked\r
        \r
        "};

        let mut buf = BytesMut::from(str);
        let mut decoder = RequestDecoder::new();
        let error = decoder.decode(&mut buf).unwrap_err();
        assert!(matches!(error, ParseError::UnsupportedTransferEncoding));
    }

    #[test]
    fn invalid_content_length_is_rejected() {
        let str = indoc! {"
        POST /submit HTTP/1.1\r
        Host: localhost\r
        Content-Length: not-a-number\r
        \r
        "};

        let mut buf = BytesMut::from(str);
        let mut decoder = RequestDecoder::new();
        let error = decoder.decode(&mut buf).unwrap_err();
        assert!(matches!(error, ParseError::InvalidContentLength { .. }));
    }

    #[test]
    fn oversized_head_is_rejected() {
        let mut buf = BytesMut::from("GET / HTTP/1.1\r\n");
        let filler = "x".repeat(MAX_HEADER_BYTES);
        buf.extend_from_slice(format!("Filler: {filler}\r\n\r\n").as_bytes());

        let mut decoder = RequestDecoder::new();
        let error = decoder.decode(&mut buf).unwrap_err();
        assert!(matches!(error, ParseError::TooLargeHeader { .. }));
    }
}
