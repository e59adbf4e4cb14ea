//! Core HTTP protocol abstractions.
//!
//! This module holds the building blocks shared between the request decoder
//! and the response encoder:
//!
//! - [`Message`], [`PayloadItem`], [`PayloadSize`]: framing items, a message
//!   is either a head or a body chunk / EOF marker
//! - [`RequestHeader`]: parsed request head with connection semantics
//! - [`ResponseHead`]: response head before the body is attached
//! - [`HttpError`], [`ParseError`], [`SendError`]: the error taxonomy of the
//!   wire path
//!
//! Chunked transfer encoding is deliberately unsupported; bodies are either
//! absent or carry a known Content-Length.

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHeader;

mod response;
pub use response::ResponseHead;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
