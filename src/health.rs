//! HTTP health server for liveness and readiness probes.
//!
//! Provides `/healthz` (liveness) and `/readyz` (readiness, with the number
//! of active sessions) on a listener separate from the proxy.

use std::convert::Infallible;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, ToSocketAddrs};

use crate::store::SessionStore;

/// Handles health check requests.
///
/// Returns 200 "ok" for `/healthz`, 200 with the active session count for
/// `/readyz`, and 404 for all other paths.
pub async fn health_handler<B>(
    req: Request<B>,
    sessions: Arc<SessionStore>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (status, body) = match req.uri().path() {
        "/healthz" => (StatusCode::OK, "ok".to_string()),
        "/readyz" => (StatusCode::OK, format!("ok sessions={}", sessions.len())),
        _ => (StatusCode::NOT_FOUND, "not found".to_string()),
    };

    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    Ok(response)
}

/// Starts the HTTP health server on the given address.
///
/// Runs indefinitely, accepting connections and handling health requests.
pub async fn start_health_server<A: ToSocketAddrs>(
    addr: A,
    sessions: Arc<SessionStore>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let sessions = Arc::clone(&sessions);

        tokio::spawn(async move {
            let svc = service_fn(move |req| health_handler(req, Arc::clone(&sessions)));
            if let Err(e) = http1::Builder::new().serve_connection(io, svc).await {
                tracing::debug!(error = %e, "health connection error");
            }
        });
    }
}
