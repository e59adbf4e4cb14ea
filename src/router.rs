//! Prefix-based request dispatch.
//!
//! Deliberately minimal glue: routes are path prefixes, the longest matching
//! prefix wins, and unmatched paths fall through to a default handler (404 if
//! none is configured). The router is itself a [`Handler`], so the recovery
//! wrapper can decorate the whole dispatch tree at once.

use async_trait::async_trait;
use http::StatusCode;

use crate::capture::ResponseCapture;
use crate::handler::Handler;
use crate::protocol::RequestHeader;

/// Dispatches requests to the handler registered under the longest matching
/// path prefix.
pub struct Router {
    routes: Vec<(String, Box<dyn Handler>)>,
    default_handler: Box<dyn Handler>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefixes: Vec<&str> = self.routes.iter().map(|(prefix, _)| prefix.as_str()).collect();
        f.debug_struct("Router").field("routes", &prefixes).finish_non_exhaustive()
    }
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    fn at(&self, path: &str) -> &dyn Handler {
        self.routes
            .iter()
            .filter(|(prefix, _)| path.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(self.default_handler.as_ref(), |(_, handler)| handler.as_ref())
    }
}

#[async_trait]
impl Handler for Router {
    async fn handle(&self, request: &RequestHeader, response: &mut ResponseCapture) {
        self.at(request.uri().path()).handle(request, response).await;
    }
}

/// Builder for [`Router`].
#[derive(Default)]
pub struct RouterBuilder {
    routes: Vec<(String, Box<dyn Handler>)>,
    default_handler: Option<Box<dyn Handler>>,
}

impl std::fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefixes: Vec<&str> = self.routes.iter().map(|(prefix, _)| prefix.as_str()).collect();
        f.debug_struct("RouterBuilder").field("routes", &prefixes).finish_non_exhaustive()
    }
}

impl RouterBuilder {
    fn new() -> Self {
        Default::default()
    }

    /// Registers a handler under a path prefix.
    pub fn route(mut self, prefix: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.routes.push((prefix.into(), Box::new(handler)));
        self
    }

    /// Sets the handler for paths no prefix matches.
    pub fn default_handler(mut self, handler: impl Handler + 'static) -> Self {
        self.default_handler = Some(Box::new(handler));
        self
    }

    pub fn build(self) -> Router {
        Router {
            routes: self.routes,
            default_handler: self.default_handler.unwrap_or_else(|| Box::new(NotFoundHandler)),
        }
    }
}

/// Fallback answering 404 when no default handler is configured.
struct NotFoundHandler;

#[async_trait]
impl Handler for NotFoundHandler {
    async fn handle(&self, _request: &RequestHeader, response: &mut ResponseCapture) {
        response.set_status(StatusCode::NOT_FOUND);
        response.write("404 page not found\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Request, Uri};

    struct Tag(&'static str);

    #[async_trait]
    impl Handler for Tag {
        async fn handle(&self, _request: &RequestHeader, response: &mut ResponseCapture) {
            response.write(self.0);
        }
    }

    fn request(path: &str) -> RequestHeader {
        let mut inner = Request::new(());
        *inner.uri_mut() = path.parse::<Uri>().unwrap();
        RequestHeader::from(inner)
    }

    async fn dispatched_tag(router: &Router, path: &str) -> ResponseCapture {
        let mut capture = ResponseCapture::new();
        router.handle(&request(path), &mut capture).await;
        capture
    }

    #[tokio::test]
    async fn longest_prefix_wins() {
        let router = Router::builder()
            .route("/panic/", Tag("panic"))
            .route("/panic-after/", Tag("panic-after"))
            .default_handler(Tag("default"))
            .build();

        let capture = dispatched_tag(&router, "/panic-after/x").await;
        assert_eq!(capture.body_len(), "panic-after".len() as u64);

        let capture = dispatched_tag(&router, "/panic/x").await;
        assert_eq!(capture.body_len(), "panic".len() as u64);

        let capture = dispatched_tag(&router, "/anything-else").await;
        assert_eq!(capture.body_len(), "default".len() as u64);
    }

    #[tokio::test]
    async fn missing_default_answers_404() {
        let router = Router::builder().route("/known/", Tag("known")).build();
        let capture = dispatched_tag(&router, "/unknown").await;
        assert_eq!(capture.status(), Some(StatusCode::NOT_FOUND));
    }
}
