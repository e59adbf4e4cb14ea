//! HTTP response head handling.
//!
//! The head of a response is represented with the standard `http::Response`
//! type carrying an empty body placeholder; the body itself travels as
//! separate payload chunks.

use http::Response;

/// The head portion of an HTTP response, before the body is attached.
pub type ResponseHead = Response<()>;
