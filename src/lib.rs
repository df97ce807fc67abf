//! Session-aware reverse proxy for WebDriver-style backends.
//!
//! Session creation requests are dispatched to a backend chosen by a
//! pluggable [`DispatchStrategy`]; the backend-assigned session id is
//! remembered so every later request for that session reaches the same
//! backend.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod proxy;
pub mod store;

pub use config::ProxyConfig;
pub use dispatch::{BackendEndpoint, DispatchStrategy, RoundRobinStrategy};
pub use error::{ProxyError, Result};
pub use proxy::SessionRouter;
pub use store::SessionStore;
