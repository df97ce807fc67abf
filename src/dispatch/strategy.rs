//! Pluggable policy deciding which backend owns a new session.

use async_trait::async_trait;

use super::BackendEndpoint;
use crate::error::Result;

/// Decides where new sessions go and is told when they end.
///
/// Implementations must be `Send + Sync`: the routing core shares one
/// instance across all connection tasks. Any waiting done inside
/// `select_backend` must be bounded by the implementation itself.
#[async_trait]
pub trait DispatchStrategy: Send + Sync {
    /// Picks the backend for a new session.
    ///
    /// `creation_body` is the raw body of the new-session request. It may be
    /// empty or not valid JSON.
    async fn select_backend(&self, creation_body: &[u8]) -> Result<BackendEndpoint>;

    /// Called after a backend confirmed deletion of `session_id`.
    ///
    /// Fire-and-forget. Errors must be handled (logged) inside the
    /// implementation; they never reach the client.
    fn on_session_ended(&self, _endpoint: &BackendEndpoint, _session_id: &str) {}

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}
