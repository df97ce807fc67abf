//! Session routing core.
//!
//! Creation requests are dispatched to a backend chosen by the strategy and
//! the returned session id is registered. Every other request is forwarded
//! to the backend that owns its session.

use std::error::Error as StdError;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Body;

use super::paths::{
    extract_session_id, is_create_session, rewrite_location, session_id_from_location,
};
use super::upstream::{BackendResponse, UpstreamClient};
use crate::dispatch::{BackendEndpoint, DispatchStrategy};
use crate::error::{ProxyError, Result};
use crate::store::SessionStore;

/// Prefix of every body the proxy synthesizes itself.
const DIAGNOSTIC_PREFIX: &str = "Session Proxy";

/// Largest request body read by default (16 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Outcome of a request that reached a backend.
#[derive(Debug)]
pub struct Routed {
    pub backend: BackendEndpoint,
    pub session_id: Option<String>,
    pub response: BackendResponse,
}

impl Routed {
    fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.response.body));
        *response.status_mut() = self.response.status;
        *response.headers_mut() = self.response.headers;
        response
    }
}

/// Routes requests to backends by session.
///
/// Exclusively owns the session table's write path. Thread-safe: shared by
/// every connection task behind an `Arc`.
pub struct SessionRouter {
    strategy: Arc<dyn DispatchStrategy>,
    sessions: Arc<SessionStore>,
    upstream: UpstreamClient,
    max_body_bytes: usize,
}

impl SessionRouter {
    pub fn new(
        strategy: Arc<dyn DispatchStrategy>,
        sessions: Arc<SessionStore>,
        upstream: UpstreamClient,
    ) -> Self {
        Self {
            strategy,
            sessions,
            upstream,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Caps the request body size; a larger declared length is a `400`.
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Returns the session table.
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Handles one inbound request and always produces a response.
    ///
    /// Backend responses are relayed; proxy-side failures become plain-text
    /// error responses with the status of the matching `ProxyError`.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let result = if is_create_session(&method, &path) {
            self.create_session(req).await
        } else {
            self.forward(req).await
        };

        match result {
            Ok(routed) => {
                tracing::info!(
                    method = %method,
                    path = %path,
                    status = routed.response.status.as_u16(),
                    backend = %routed.backend,
                    session_id = routed.session_id.as_deref().unwrap_or("-"),
                    "request completed"
                );
                routed.into_response()
            }
            Err(err) => {
                let status = err.status_code();
                if status.is_server_error() {
                    tracing::error!(
                        method = %method,
                        path = %path,
                        status = status.as_u16(),
                        error = %err,
                        "request failed"
                    );
                } else {
                    tracing::warn!(
                        method = %method,
                        path = %path,
                        status = status.as_u16(),
                        error = %err,
                        "request rejected"
                    );
                }
                error_response(&err)
            }
        }
    }

    /// Opens a new session on a backend chosen by the strategy.
    ///
    /// On success the session is registered and the `Location` header points
    /// at the owning backend. A backend that answers with an error status is
    /// relayed as-is and nothing is registered.
    pub async fn create_session<B>(&self, req: Request<B>) -> Result<Routed>
    where
        B: Body,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();
        let body = read_body(&parts.headers, body, self.max_body_bytes).await?;

        let backend = self.strategy.select_backend(&body).await?;
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|p| p.as_str())
            .unwrap_or(super::paths::CREATE_SESSION_PATH);

        let mut response = self
            .upstream
            .send(&backend, parts.method, path_and_query, &parts.headers, body)
            .await?;

        if response.status.is_client_error() || response.status.is_server_error() {
            tracing::warn!(
                backend = %backend,
                status = response.status.as_u16(),
                "backend refused session creation"
            );
            return Ok(Routed {
                backend,
                session_id: None,
                response,
            });
        }

        let malformed = |reason: String| ProxyError::MalformedBackendResponse {
            backend: backend.clone(),
            reason,
        };

        let location = response
            .headers
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| malformed("missing location header".to_string()))?
            .to_string();

        let session_id = session_id_from_location(&location)
            .ok_or_else(|| malformed(format!("no session id in location '{}'", location)))?;

        let rewritten = rewrite_location(&location, &backend).map_err(malformed)?;
        let rewritten = HeaderValue::from_str(&rewritten.to_string())
            .map_err(|e| malformed(format!("unusable location: {}", e)))?;

        self.sessions.put(&session_id, backend.clone())?;
        response.headers.insert(LOCATION, rewritten);

        tracing::info!(
            session_id = %session_id,
            backend = %backend,
            strategy = self.strategy.name(),
            active_sessions = self.sessions.len(),
            "session registered"
        );

        Ok(Routed {
            backend,
            session_id: Some(session_id),
            response,
        })
    }

    /// Forwards a request to the backend that owns its session.
    ///
    /// Any `DELETE` the backend answers with `200` ends the session.
    pub async fn forward<B>(&self, req: Request<B>) -> Result<Routed>
    where
        B: Body,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();

        let session_id = extract_session_id(parts.uri.path())
            .ok_or(ProxyError::NoSessionInPath)?
            .to_string();

        let backend = self
            .sessions
            .get(&session_id)
            .ok_or_else(|| ProxyError::UnknownSession(session_id.clone()))?;

        let body = read_body(&parts.headers, body, self.max_body_bytes).await?;
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|p| p.as_str())
            .unwrap_or_else(|| parts.uri.path());

        let response = self
            .upstream
            .send(
                &backend,
                parts.method.clone(),
                path_and_query,
                &parts.headers,
                body,
            )
            .await?;

        if parts.method == Method::DELETE && response.status == StatusCode::OK {
            self.end_session(&backend, &session_id);
        }

        Ok(Routed {
            backend,
            session_id: Some(session_id),
            response,
        })
    }

    /// Notifies the strategy and drops the session from the table.
    ///
    /// The entry is removed even if the hook panics.
    fn end_session(&self, backend: &BackendEndpoint, session_id: &str) {
        let notified = panic::catch_unwind(AssertUnwindSafe(|| {
            self.strategy.on_session_ended(backend, session_id)
        }));

        self.sessions.remove(session_id);

        if notified.is_err() {
            tracing::error!(
                session_id = %session_id,
                backend = %backend,
                strategy = self.strategy.name(),
                "session end hook panicked"
            );
        }

        tracing::info!(
            session_id = %session_id,
            backend = %backend,
            active_sessions = self.sessions.len(),
            "session removed"
        );
    }
}

/// Reads at most `Content-Length` bytes of the request body.
///
/// A missing, zero or unparsable length reads nothing. A length above
/// `limit` is rejected before any byte is read.
async fn read_body<B>(headers: &HeaderMap, body: B, limit: usize) -> Result<Bytes>
where
    B: Body,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    if declared == 0 {
        return Ok(Bytes::new());
    }
    if declared > limit {
        return Err(ProxyError::RequestBody(format!(
            "declared length {} exceeds limit of {} bytes",
            declared, limit
        )));
    }

    Limited::new(body, declared)
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|e| ProxyError::RequestBody(e.to_string()))
}

/// Builds the plain-text response for a proxy-side failure.
pub fn error_response(err: &ProxyError) -> Response<Full<Bytes>> {
    let body = format!("{}: {}", DIAGNOSTIC_PREFIX, err);
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = err.status_code();
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
