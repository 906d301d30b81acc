//! Ordered, named middleware around the transport call.
//!
//! # Design
//! Middleware run left to right in registration order. Each one receives the
//! request and a `Next` that runs the rest of the chain and finally the
//! transport, so a middleware can rewrite the request, short-circuit with its
//! own response, inspect the response on the way back, or fail.
//!
//! Registration returns a `MiddlewareId` handle; removing by handle leaves
//! the relative order of the others untouched.

use std::fmt;
use std::sync::Arc;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

/// A step in the request pipeline.
pub trait Middleware: Send + Sync {
    fn name(&self) -> &str;

    fn handle(&self, request: HttpRequest, next: Next<'_>) -> Result<HttpResponse, TransportError>;
}

/// Handle returned by `ApiClient::add_middleware`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MiddlewareId(pub(crate) u64);

impl fmt::Display for MiddlewareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "middleware#{}", self.0)
    }
}

/// The remainder of the chain.
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    pub(crate) fn new(middlewares: &'a [Arc<dyn Middleware>], transport: &'a dyn Transport) -> Self {
        Self {
            middlewares,
            transport,
        }
    }

    pub fn run(self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        match self.middlewares.split_first() {
            Some((first, rest)) => first.handle(request, Next::new(rest, self.transport)),
            None => self.transport.send(&request),
        }
    }
}

/// Middleware built from a closure.
pub struct FnMiddleware<F> {
    name: String,
    f: F,
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(HttpRequest, Next<'_>) -> Result<HttpResponse, TransportError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: HttpRequest, next: Next<'_>) -> Result<HttpResponse, TransportError> {
        (self.f)(request, next)
    }
}

pub fn from_fn<F>(name: impl Into<String>, f: F) -> FnMiddleware<F>
where
    F: Fn(HttpRequest, Next<'_>) -> Result<HttpResponse, TransportError> + Send + Sync,
{
    FnMiddleware {
        name: name.into(),
        f,
    }
}

/// Registered middleware, in order.
#[derive(Default)]
pub(crate) struct Chain {
    entries: Vec<(MiddlewareId, Arc<dyn Middleware>)>,
    next_id: u64,
}

impl Chain {
    pub(crate) fn push(&mut self, middleware: Arc<dyn Middleware>) -> MiddlewareId {
        let id = MiddlewareId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, middleware));
        id
    }

    pub(crate) fn remove(&mut self, id: MiddlewareId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(_, m)| m.name().to_string()).collect()
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn Middleware>> {
        self.entries.iter().map(|(_, m)| Arc::clone(m)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use std::sync::Mutex;

    fn echo_transport(req: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let trace = req.header("x-trace").unwrap_or_default().to_string();
        Ok(HttpResponse::new(200, trace.into_bytes()))
    }

    fn tagger(tag: &'static str) -> Arc<dyn Middleware> {
        Arc::new(from_fn(tag, move |mut req: HttpRequest, next: Next<'_>| {
            let trace = format!("{}{tag}", req.header("x-trace").unwrap_or_default());
            req.set_header("x-trace", trace);
            next.run(req)
        }))
    }

    #[test]
    fn runs_left_to_right() {
        let mut chain = Chain::default();
        chain.push(tagger("a"));
        chain.push(tagger("b"));
        let snapshot = chain.snapshot();
        let response = Next::new(&snapshot, &echo_transport)
            .run(HttpRequest::new(HttpMethod::Get, "/"))
            .unwrap();
        assert_eq!(response.text(), "ab");
    }

    #[test]
    fn remove_by_handle_keeps_order() {
        let mut chain = Chain::default();
        let a = chain.push(tagger("a"));
        chain.push(tagger("b"));
        chain.push(tagger("c"));
        assert!(chain.remove(a));
        assert!(!chain.remove(a));
        assert_eq!(chain.names(), vec!["b", "c"]);
    }

    #[test]
    fn middleware_can_short_circuit() {
        let calls = Arc::new(Mutex::new(0));
        let seen = Arc::clone(&calls);
        let transport = move |_: &HttpRequest| {
            *seen.lock().unwrap() += 1;
            Ok::<_, TransportError>(HttpResponse::new(200, Vec::new()))
        };
        let cached: Arc<dyn Middleware> = Arc::new(from_fn("cache", |_req: HttpRequest, _next: Next<'_>| {
            Ok(HttpResponse::new(200, b"cached".to_vec()))
        }));
        let chain = vec![cached];
        let response = Next::new(&chain, &transport)
            .run(HttpRequest::new(HttpMethod::Get, "/"))
            .unwrap();
        assert_eq!(response.text(), "cached");
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn middleware_errors_propagate() {
        let deny: Arc<dyn Middleware> = Arc::new(from_fn("deny", |_req: HttpRequest, _next: Next<'_>| {
            Err(TransportError::new("blocked"))
        }));
        let chain = vec![deny];
        let err = Next::new(&chain, &echo_transport)
            .run(HttpRequest::new(HttpMethod::Get, "/"))
            .unwrap_err();
        assert_eq!(err.message, "blocked");
    }
}
