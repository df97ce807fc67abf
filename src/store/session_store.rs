//! Thread-safe session table using DashMap.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::dispatch::BackendEndpoint;
use crate::error::{ProxyError, Result};

/// Maps backend-assigned session ids to the endpoint that owns them.
///
/// Uses a sharded `DashMap`, so operations on different ids do not contend
/// on a single lock. Each operation is atomic per key.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, BackendEndpoint>,
}

impl SessionStore {
    /// Creates a new empty session store.
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Registers a new session.
    ///
    /// Fails with `DuplicateSession` if the id is already present; the
    /// existing entry is left untouched.
    pub fn put(&self, session_id: &str, endpoint: BackendEndpoint) -> Result<()> {
        match self.sessions.entry(session_id.to_string()) {
            Entry::Occupied(_) => Err(ProxyError::DuplicateSession(session_id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(endpoint);
                Ok(())
            }
        }
    }

    /// Returns the endpoint owning `session_id`, if the session is known.
    pub fn get(&self, session_id: &str) -> Option<BackendEndpoint> {
        self.sessions
            .get(session_id)
            .map(|entry| entry.value().clone())
    }

    /// Forgets a session. Removing an unknown id is a no-op.
    ///
    /// Returns the endpoint that owned it, if any.
    pub fn remove(&self, session_id: &str) -> Option<BackendEndpoint> {
        self.sessions.remove(session_id).map(|(_, endpoint)| endpoint)
    }

    /// Returns the number of active sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
