//! Session routing and HTTP proxying.
//!
//! Matches session paths, routes creation requests through the dispatch
//! strategy, forwards session traffic to the owning backend, and serves
//! it all over HTTP/1.1.

mod gateway;
mod paths;
mod router;
mod upstream;

pub use gateway::serve;
pub use paths::{
    extract_session_id, is_create_session, rewrite_location, session_id_from_location,
    CREATE_SESSION_PATH,
};
pub use router::{error_response, Routed, SessionRouter, DEFAULT_MAX_BODY_BYTES};
pub use upstream::{BackendResponse, UpstreamClient, UpstreamConfig};
