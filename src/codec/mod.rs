//! Wire codecs for the request and response paths.
//!
//! - [`RequestDecoder`]: streaming decoder for incoming requests, head first,
//!   then fixed-length body chunks
//! - [`ResponseEncoder`]: encoder for outgoing responses, head first, then
//!   raw body chunks
//!
//! Both sides speak HTTP/1.1 with Content-Length framing only.

mod request_decoder;
pub use request_decoder::RequestDecoder;

mod response_encoder;
pub use response_encoder::ResponseEncoder;
