//! HTTP/1.1 front for the session router.
//!
//! Accepts connections and serves each one on its own task, handing every
//! request to the shared `SessionRouter`.

use std::convert::Infallible;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use super::SessionRouter;

/// Serves the proxy on an already bound listener.
///
/// Accept errors are logged and skipped; connection errors only end their
/// own connection.
pub async fn serve(listener: TcpListener, router: Arc<SessionRouter>) -> std::io::Result<()> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(error = %e, "proxy accept error");
                continue;
            }
        };

        let router = Arc::clone(&router);
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let svc = service_fn(move |req: Request<Incoming>| {
                let router = Arc::clone(&router);
                async move { Ok::<_, Infallible>(router.handle(req).await) }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, svc).await {
                tracing::debug!(error = %e, peer = %peer, "proxy connection error");
            }
        });
    }
}
