//! HTTP connection handling.
//!
//! - [`MessageWriter`]: response encoder plus staging buffer over the write
//!   half of the connection, the "real output channel" a
//!   [`crate::capture::ResponseCapture`] commits into
//! - [`HttpConnection`]: the keep-alive request loop, one capture per
//!   request, committed after the handler chain returns

mod http_connection;
pub use http_connection::HttpConnection;

mod message_writer;
pub use message_writer::MessageWriter;
