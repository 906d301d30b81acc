//! The network boundary.
//!
//! `Transport` is the only place a request leaves the process. The client
//! never interprets transport-level details beyond the status, status text,
//! headers and body it gets back; non-2xx statuses come back as data.

use std::time::Duration;

use tracing::debug;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Read cap for bodies that are decoded as text or JSON.
pub const TEXT_BODY_LIMIT: u64 = 10 * 1024 * 1024;

/// Executes a fully built request.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync,
{
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self(request)
    }
}

/// `Transport` backed by a `ureq` agent.
///
/// Disables ureq's automatic status-code-as-error behavior so 4xx/5xx
/// responses are returned as data, letting the client apply its own
/// message resolution.
///
/// Textual bodies are capped at `TEXT_BODY_LIMIT`; binary response types
/// are read in full.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

fn decorate<B>(mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    for (name, value) in &request.query {
        builder = builder.query(name, value);
    }
    builder
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!(method = %request.method, url = %request.url, "sending request");
        let url = request.url.as_str();
        let body = request.body.as_deref();

        let result = match (request.method, body) {
            (HttpMethod::Get, _) => decorate(self.agent.get(url), request).call(),
            (HttpMethod::Delete, _) => decorate(self.agent.delete(url), request).call(),
            (HttpMethod::Post, Some(body)) => decorate(self.agent.post(url), request).send(body.as_bytes()),
            (HttpMethod::Post, None) => decorate(self.agent.post(url), request).send_empty(),
            (HttpMethod::Put, Some(body)) => decorate(self.agent.put(url), request).send(body.as_bytes()),
            (HttpMethod::Put, None) => decorate(self.agent.put(url), request).send_empty(),
            (HttpMethod::Patch, Some(body)) => decorate(self.agent.patch(url), request).send(body.as_bytes()),
            (HttpMethod::Patch, None) => decorate(self.agent.patch(url), request).send_empty(),
        };
        let mut response = result.map_err(|e| TransportError::new(e.to_string()))?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let limit = if request.response_type.is_binary() {
            u64::MAX
        } else {
            TEXT_BODY_LIMIT
        };
        let body = response
            .body_mut()
            .with_config()
            .limit(limit)
            .read_to_vec()
            .map_err(|e| TransportError::new(e.to_string()))?;

        debug!(status = status.as_u16(), bytes = body.len(), "received response");
        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_transports() {
        let transport =
            |req: &HttpRequest| Ok::<_, TransportError>(HttpResponse::new(200, req.url.clone().into_bytes()));
        let response = transport
            .send(&HttpRequest::new(HttpMethod::Get, "http://host/ping"))
            .unwrap();
        assert_eq!(response.text(), "http://host/ping");
    }

    #[test]
    fn unreachable_host_is_a_transport_error() {
        let transport = UreqTransport::new(Duration::from_secs(2));
        let err = transport
            .send(&HttpRequest::new(HttpMethod::Get, "http://127.0.0.1:1/unreachable"))
            .unwrap_err();
        assert!(!err.message.is_empty());
    }
}
