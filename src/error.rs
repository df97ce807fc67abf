//! Error taxonomy for the session proxy.
//!
//! Every variant maps to the HTTP status the front returns when the
//! condition is synthesized by the proxy rather than relayed from a backend.

use std::time::Duration;

use hyper::StatusCode;
use thiserror::Error;

use crate::dispatch::BackendEndpoint;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("no session provided")]
    NoSessionInPath,

    #[error("session {0} not found")]
    UnknownSession(String),

    #[error("malformed response from backend {backend}: {reason}")]
    MalformedBackendResponse {
        backend: BackendEndpoint,
        reason: String,
    },

    #[error("session {0} is already registered")]
    DuplicateSession(String),

    #[error("backend {backend} unreachable: {reason}")]
    BackendUnreachable {
        backend: BackendEndpoint,
        reason: String,
    },

    #[error("backend {backend} did not answer within {timeout:?}")]
    BackendTimeout {
        backend: BackendEndpoint,
        timeout: Duration,
    },

    #[error("no backend available: {0}")]
    NoBackendAvailable(String),

    #[error("failed to read request body: {0}")]
    RequestBody(String),

    #[error("invalid backend endpoint '{address}': {reason}")]
    InvalidEndpoint { address: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] http::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProxyError {
    /// Status code reported to the client for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::NoSessionInPath | ProxyError::UnknownSession(_) => StatusCode::NOT_FOUND,
            ProxyError::MalformedBackendResponse { .. } | ProxyError::BackendUnreachable { .. } => {
                StatusCode::BAD_GATEWAY
            }
            ProxyError::BackendTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::NoBackendAvailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::RequestBody(_) => StatusCode::BAD_REQUEST,
            ProxyError::DuplicateSession(_)
            | ProxyError::InvalidEndpoint { .. }
            | ProxyError::Config(_)
            | ProxyError::Http(_)
            | ProxyError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
