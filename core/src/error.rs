//! Error types for the portal API client.
//!
//! # Design
//! Callers only ever see `ApiError`, and every variant carries a
//! human-readable message. `Transport` covers network failures and non-2xx
//! statuses; `Application` covers 2xx responses whose envelope `code` is not
//! a success code. Transports and middleware fail with the narrower
//! `TransportError`, which the client normalizes into `ApiError::Transport`.

use serde_json::Number;
use thiserror::Error;

/// Message used when nothing more specific can be extracted.
pub const FALLBACK_MESSAGE: &str = "request failed";

/// Errors returned by `ApiClient` calls.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// Network failure, or the server answered with a non-2xx status.
    #[error("{message}")]
    Transport { status: Option<u16>, message: String },

    /// The envelope carried a code outside the success policy. The code is
    /// kept as sent, so a fractional one such as `1.5` survives.
    #[error("{message}")]
    Application { code: Number, message: String },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The resolved value could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request could not be built (bad URL, binary response through a typed call).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// The human-readable message, without any variant prefix.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Transport { message, .. } | ApiError::Application { message, .. } => message,
            ApiError::Serialization(msg)
            | ApiError::Deserialization(msg)
            | ApiError::InvalidRequest(msg) => msg,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

/// Failure reported by a `Transport` or a middleware before any response
/// was classified.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        let message = if err.message.is_empty() {
            FALLBACK_MESSAGE.to_string()
        } else {
            err.message
        };
        ApiError::Transport {
            status: None,
            message,
        }
    }
}
