//! API client core for the portal front end.
//!
//! # Overview
//! Wraps an HTTP transport with bearer-token injection, unified
//! `{ code, data, message }` envelope decoding and error normalization, and
//! exposes typed endpoint functions on top. A small route table with the
//! root redirect lives alongside.
//!
//! # Design
//! - `ApiClient` is built from an explicit `ClientConfig`; token getter,
//!   error handler and middleware are owned by the client, not globals.
//! - The network sits behind the `Transport` trait; `UreqTransport` is the
//!   default and tests plug in closures.
//! - Bodies are classified once into `envelope::Body` before any decision
//!   is made on them.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod middleware;
pub mod router;
pub mod store;
pub mod transport;
pub mod types;

pub use client::{ApiClient, Outcome, RequestConfig, RequestOptions};
pub use config::ClientConfig;
pub use envelope::{Body, Envelope, SuccessPolicy};
pub use error::{ApiError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, ResponseType};
pub use middleware::{Middleware, MiddlewareId, Next};
pub use router::{Route, RouteError, Router};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use transport::{Transport, UreqTransport};
pub use types::HomeData;
