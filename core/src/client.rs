//! The request/response adapter.
//!
//! # Design
//! `ApiClient` runs one pass per call: build the request, attach the bearer
//! token, run the middleware chain around the transport, then classify the
//! response. Classification order:
//!
//! 1. non-2xx status: transport error
//! 2. binary response type: the untouched `HttpResponse`
//! 3. text response type: the body as a JSON string, never unwrapped
//! 4. `raw` option: the parsed body, verbatim
//! 5. envelope with a success code: its `data`
//! 6. envelope with any other code: application error
//! 7. anything else: the parsed body, as is
//!
//! Every error leaving the client is passed to the error handler exactly
//! once first. Nothing is retried.
//!
//! The token getter, error handler and middleware list can be swapped while
//! the client is shared; each call reads them once at the start.

use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::{ClientConfig, ErrorHandler, TokenGetter};
use crate::envelope::{application_message, Body, SuccessPolicy};
use crate::error::{ApiError, FALLBACK_MESSAGE};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, ResponseType};
use crate::middleware::{Chain, Middleware, MiddlewareId, Next};
use crate::store::{TokenStore, TOKEN_KEY};
use crate::transport::{Transport, UreqTransport};

pub const AUTHORIZATION: &str = "Authorization";
const BEARER_PREFIX: &str = "Bearer ";

/// Per-call switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Skip envelope handling and resolve with the body as received.
    pub raw: bool,
    /// Attach the bearer token when the request has no `Authorization` header.
    pub with_auth: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            raw: false,
            with_auth: true,
        }
    }
}

impl RequestOptions {
    pub fn raw() -> Self {
        Self {
            raw: true,
            ..Self::default()
        }
    }

    pub fn anonymous() -> Self {
        Self {
            with_auth: false,
            ..Self::default()
        }
    }
}

/// What the caller asks for: a URL relative to the base URL (or absolute),
/// plus headers, query parameters, an optional JSON body and the expected
/// response type.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestConfig {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub params: Vec<(String, String)>,
    pub body: Option<String>,
    pub response_type: ResponseType,
}

impl RequestConfig {
    pub fn new(method: HttpMethod, url: &str) -> Self {
        Self {
            method,
            url: url.to_string(),
            headers: Vec::new(),
            params: Vec::new(),
            body: None,
            response_type: ResponseType::default(),
        }
    }

    pub fn get(url: &str) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn params(mut self, params: &[(&str, &str)]) -> Self {
        self.params
            .extend(params.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        self
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        self.body = Some(body);
        Ok(self)
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }
}

/// A successfully classified response.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Binary response type: the transport response, untouched.
    Binary(HttpResponse),
    /// Envelope `data`, a raw body, or a non-envelope body.
    Body(Value),
}

impl Outcome {
    pub fn into_body(self) -> Option<Value> {
        match self {
            Outcome::Body(value) => Some(value),
            Outcome::Binary(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<Value>,
}

/// HTTP client enforcing the envelope contract across endpoints.
pub struct ApiClient {
    base_url: String,
    default_headers: Vec<(String, String)>,
    success_policy: SuccessPolicy,
    token_store: Arc<dyn TokenStore>,
    token_getter: RwLock<Option<TokenGetter>>,
    error_handler: RwLock<ErrorHandler>,
    middleware: RwLock<Chain>,
    transport: Box<dyn Transport>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, transport: impl Transport + 'static) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_headers: config.default_headers,
            success_policy: config.success_policy,
            token_store: config.token_store,
            token_getter: RwLock::new(config.token_getter),
            error_handler: RwLock::new(config.error_handler),
            middleware: RwLock::new(Chain::default()),
            transport: Box::new(transport),
        }
    }

    /// Client over a `ureq` transport using the configured timeout.
    pub fn from_config(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(config.timeout);
        Self::new(config, transport)
    }

    pub fn from_env() -> Self {
        Self::from_config(ClientConfig::from_env())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token_store(&self) -> &dyn TokenStore {
        self.token_store.as_ref()
    }

    pub fn set_token_getter<F>(&self, getter: F)
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        *self.token_getter.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(getter));
    }

    pub fn clear_token_getter(&self) {
        *self.token_getter.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn set_error_handler<F>(&self, handler: F)
    where
        F: Fn(&ApiError) + Send + Sync + 'static,
    {
        *self.error_handler.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(handler);
    }

    pub fn add_middleware(&self, middleware: impl Middleware + 'static) -> MiddlewareId {
        self.middleware
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(middleware))
    }

    /// Returns `false` when the handle was already removed.
    pub fn remove_middleware(&self, id: MiddlewareId) -> bool {
        self.middleware
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    pub fn middleware_names(&self) -> Vec<String> {
        self.middleware
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .names()
    }

    /// Run the pipeline and return the classified outcome.
    pub fn send(&self, config: RequestConfig, options: RequestOptions) -> Result<Outcome, ApiError> {
        self.execute(config, options).or_else(|err| self.fail(err))
    }

    /// Run the pipeline and decode the outcome into `T`.
    pub fn request<T: DeserializeOwned>(
        &self,
        config: RequestConfig,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        match self.send(config, options)? {
            Outcome::Body(value) => serde_json::from_value(value)
                .or_else(|e| self.fail(ApiError::Deserialization(e.to_string()))),
            Outcome::Binary(_) => self.fail(ApiError::InvalidRequest(
                "binary response types resolve to the raw response; use `send` or `download`".to_string(),
            )),
        }
    }

    /// Fetch a binary payload. The response type is forced to `Blob` unless
    /// the config already asks for a binary type.
    pub fn download(&self, mut config: RequestConfig) -> Result<HttpResponse, ApiError> {
        if !config.response_type.is_binary() {
            config.response_type = ResponseType::Blob;
        }
        match self.send(config, RequestOptions::default())? {
            Outcome::Binary(response) => Ok(response),
            Outcome::Body(_) => self.fail(ApiError::InvalidRequest(
                "download did not produce a binary response".to_string(),
            )),
        }
    }

    pub fn get<T: DeserializeOwned>(&self, url: &str, params: &[(&str, &str)]) -> Result<T, ApiError> {
        self.get_with(url, params, RequestOptions::default())
    }

    pub fn get_with<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.request(RequestConfig::new(HttpMethod::Get, url).params(params), options)
    }

    pub fn delete<T: DeserializeOwned>(&self, url: &str, params: &[(&str, &str)]) -> Result<T, ApiError> {
        self.delete_with(url, params, RequestOptions::default())
    }

    pub fn delete_with<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.request(RequestConfig::new(HttpMethod::Delete, url).params(params), options)
    }

    pub fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<T, ApiError> {
        self.post_with(url, body, RequestOptions::default())
    }

    pub fn post_with<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.with_body(HttpMethod::Post, url, body, options)
    }

    pub fn put<T: DeserializeOwned, B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<T, ApiError> {
        self.put_with(url, body, RequestOptions::default())
    }

    pub fn put_with<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.with_body(HttpMethod::Put, url, body, options)
    }

    pub fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<T, ApiError> {
        self.patch_with(url, body, RequestOptions::default())
    }

    pub fn patch_with<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.with_body(HttpMethod::Patch, url, body, options)
    }

    fn with_body<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        url: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let config = RequestConfig::new(method, url)
            .json(body)
            .or_else(|err| self.fail(err))?;
        self.request(config, options)
    }

    fn execute(&self, config: RequestConfig, options: RequestOptions) -> Result<Outcome, ApiError> {
        let response_type = config.response_type;
        let mut request = self.build(config);
        if options.with_auth {
            self.authorize(&mut request);
        }

        debug!(method = %request.method, url = %request.url, raw = options.raw, "dispatching request");
        let chain = self
            .middleware
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot();
        let response = Next::new(&chain, self.transport.as_ref()).run(request)?;

        self.classify(response, response_type, options.raw)
    }

    fn build(&self, config: RequestConfig) -> HttpRequest {
        let mut request = HttpRequest::new(config.method, self.resolve_url(&config.url));
        for (name, value) in &self.default_headers {
            request.set_header(name.as_str(), value.as_str());
        }
        for (name, value) in config.headers {
            request.set_header(name, value);
        }
        request.query = config.params;
        request.body = config.body;
        request.response_type = config.response_type;
        request
    }

    fn resolve_url(&self, url: &str) -> String {
        let absolute = url.starts_with("http://") || url.starts_with("https://");
        if absolute || self.base_url.is_empty() {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{url}", self.base_url)
        } else {
            format!("{}/{url}", self.base_url)
        }
    }

    fn authorize(&self, request: &mut HttpRequest) {
        if request.has_header(AUTHORIZATION) {
            return;
        }
        let Some(token) = self.current_token() else {
            return;
        };
        if token.is_empty() {
            return;
        }
        let value = if token.starts_with(BEARER_PREFIX) {
            token
        } else {
            format!("{BEARER_PREFIX}{token}")
        };
        request.set_header(AUTHORIZATION, value);
    }

    fn current_token(&self) -> Option<String> {
        let getter = self
            .token_getter
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        getter
            .and_then(|get| get())
            .or_else(|| self.token_store.get(TOKEN_KEY))
    }

    fn classify(&self, response: HttpResponse, response_type: ResponseType, raw: bool) -> Result<Outcome, ApiError> {
        if !response.is_success() {
            return Err(transport_failure(&response));
        }
        if response_type.is_binary() {
            return Ok(Outcome::Binary(response));
        }
        if response_type == ResponseType::Text {
            return Ok(Outcome::Body(Value::String(response.text())));
        }

        let value = Body::parse(&response.text());
        if raw {
            return Ok(Outcome::Body(value));
        }

        match Body::decode(value) {
            Body::Envelope { code, data, .. } if self.success_policy.accepts(&code) => {
                Ok(Outcome::Body(data.unwrap_or(Value::Null)))
            }
            Body::Envelope { code, message, .. } => {
                debug!(%code, "envelope reported failure");
                let message = application_message(&code, message.as_deref());
                Err(ApiError::Application { code, message })
            }
            Body::Raw(value) => Ok(Outcome::Body(value)),
        }
    }

    fn fail<T>(&self, err: ApiError) -> Result<T, ApiError> {
        let handler = self
            .error_handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        handler(&err);
        Err(err)
    }
}

/// Message resolution for non-2xx responses: body `message`, then status
/// text, then a status-code message.
fn transport_failure(response: &HttpResponse) -> ApiError {
    let from_body = serde_json::from_slice::<ErrorBody>(&response.body)
        .ok()
        .and_then(|body| body.message)
        .map(|message| match message {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        })
        .filter(|m| !m.is_empty());

    let message = from_body
        .or_else(|| Some(response.status_text.clone()).filter(|t| !t.is_empty()))
        .unwrap_or_else(|| format!("{FALLBACK_MESSAGE} with status code {}", response.status));

    ApiError::Transport {
        status: Some(response.status),
        message,
    }
}
