//! Outbound HTTP client for talking to backends.
//!
//! Wraps a pooled hyper client. Redirects are never followed, so a
//! creation response's `Location` header reaches the router untouched.

use std::error::Error as StdError;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderName, CONNECTION};
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::dispatch::BackendEndpoint;
use crate::error::{ProxyError, Result};

type HttpClient = Client<HttpConnector, Full<Bytes>>;

/// Timeouts applied to backend calls.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Limit on establishing the TCP connection.
    pub connect_timeout: Duration,
    /// Limit on the whole exchange, response body included. `None` waits
    /// as long as the backend takes.
    pub request_timeout: Option<Duration>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: None,
        }
    }
}

/// A fully buffered backend response.
#[derive(Debug)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Shared client for all backend calls.
///
/// Cheap to share behind an `Arc`; the connection pool is reused across
/// requests.
pub struct UpstreamClient {
    client: HttpClient,
    config: UpstreamConfig,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(config.connect_timeout));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client, config }
    }

    /// Sends a request to `backend` and buffers the full response.
    ///
    /// End-to-end headers are copied in both directions; hop-by-hop headers
    /// are dropped. Network failures map to `BackendUnreachable`, expired
    /// limits to `BackendTimeout`.
    pub async fn send(
        &self,
        backend: &BackendEndpoint,
        method: Method,
        path_and_query: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<BackendResponse> {
        let mut request = Request::builder()
            .method(method)
            .uri(backend.url_for(path_and_query))
            .body(Full::new(body))?;
        *request.headers_mut() = headers.clone();
        strip_hop_by_hop(request.headers_mut());

        let exchange = self.exchange(backend, request);

        match self.config.request_timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| ProxyError::BackendTimeout {
                    backend: backend.clone(),
                    timeout: limit,
                })?,
            None => exchange.await,
        }
    }

    async fn exchange(
        &self,
        backend: &BackendEndpoint,
        request: Request<Full<Bytes>>,
    ) -> Result<BackendResponse> {
        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| self.classify(backend, &e))?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        let body = body
            .collect()
            .await
            .map_err(|e| self.classify(backend, &e))?
            .to_bytes();

        Ok(BackendResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }

    fn classify(&self, backend: &BackendEndpoint, err: &(dyn StdError + 'static)) -> ProxyError {
        if is_timeout(err) {
            ProxyError::BackendTimeout {
                backend: backend.clone(),
                timeout: self.config.connect_timeout,
            }
        } else {
            ProxyError::BackendUnreachable {
                backend: backend.clone(),
                reason: error_chain(err),
            }
        }
    }
}

/// Removes connection-scoped headers, including any named by `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| name.trim().parse::<HeaderName>().ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }

    let hop_by_hop: Vec<HeaderName> = headers
        .keys()
        .filter(|name| is_hop_by_hop_header(name))
        .cloned()
        .collect();

    for name in hop_by_hop {
        headers.remove(name);
    }
}

fn is_hop_by_hop_header(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "proxy-connection"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}

/// Walks the source chain looking for an I/O timeout.
fn is_timeout(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
        }
        current = e.source();
    }
    false
}

/// Joins an error and its sources into one line.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut current = err.source();
    while let Some(e) = current {
        message.push_str(": ");
        message.push_str(&e.to_string());
        current = e.source();
    }
    message
}
