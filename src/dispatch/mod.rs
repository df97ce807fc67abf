//! Backend selection for new sessions.
//!
//! Defines the backend endpoint value, the pluggable dispatch strategy
//! interface, and the round-robin reference strategy.

mod endpoint;
mod round_robin;
mod strategy;

pub use endpoint::BackendEndpoint;
pub use round_robin::RoundRobinStrategy;
pub use strategy::DispatchStrategy;
