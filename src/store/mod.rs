//! Session storage for the proxy.
//!
//! Holds the authoritative mapping from session id to the backend
//! endpoint serving it.

mod session_store;

pub use session_store::SessionStore;
