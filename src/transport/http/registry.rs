//! Session registry for the HTTP transport.
//!
//! Maps a session id to the protocol transport serving it. Sessions are
//! created on first contact and bound to the server in the background; a
//! session whose bind fails is evicted so the next request with its id starts
//! afresh.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::mcp::server::McpServer;
use crate::mcp::transport::StreamableHttpTransport;

/// One client session.
pub struct Session {
    id: String,
    transport: Arc<StreamableHttpTransport>,
}

impl Session {
    /// Returns the session id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the protocol transport serving this session.
    #[must_use]
    pub const fn transport(&self) -> &Arc<StreamableHttpTransport> {
        &self.transport
    }
}

/// Live sessions keyed by id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Session>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the session for `session_id`, creating it if needed.
    ///
    /// Without an id a fresh one is generated. A new session is bound to
    /// `server` in the background; the caller does not wait for the bind.
    /// Requests handled by the session wait for it instead.
    pub fn get_or_create(
        self: &Arc<Self>,
        session_id: Option<&str>,
        server: &Arc<McpServer>,
    ) -> Arc<Session> {
        let id = session_id.map_or_else(|| Uuid::new_v4().to_string(), String::from);

        let session = match self.lock().entry(id) {
            Entry::Occupied(entry) => return Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                let session = Arc::new(Session {
                    transport: Arc::new(StreamableHttpTransport::new(entry.key().clone())),
                    id: entry.key().clone(),
                });
                entry.insert(Arc::clone(&session));
                session
            }
        };

        debug!(session_id = %session.id, "Created session");
        self.spawn_bind(&session, server);
        session
    }

    fn spawn_bind(self: &Arc<Self>, session: &Arc<Session>, server: &Arc<McpServer>) {
        let registry = Arc::downgrade(self);
        let session = Arc::clone(session);
        let server = Arc::clone(server);

        tokio::spawn(async move {
            match server.connect(session.transport.as_ref()).await {
                Ok(()) => debug!(session_id = %session.id, "Session bound"),
                Err(e) => {
                    warn!(session_id = %session.id, error = %e, "Session bind failed, evicting");
                    session.transport.mark_failed();
                    if let Some(registry) = registry.upgrade() {
                        registry.evict(&session);
                    }
                }
            }
        });
    }

    /// Removes `session`, unless its id now belongs to a newer session.
    fn evict(&self, session: &Arc<Session>) {
        let mut sessions = self.lock();
        if sessions
            .get(&session.id)
            .is_some_and(|current| Arc::ptr_eq(current, session))
        {
            sessions.remove(&session.id);
        }
    }

    /// Returns the session for `session_id`, if it exists.
    #[must_use]
    pub fn get(&self, session_id: &str) -> Option<Arc<Session>> {
        self.lock().get(session_id).cloned()
    }

    /// Returns the number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if there are no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops every session without notifying clients.
    pub fn clear(&self) {
        let mut sessions = self.lock();
        debug!(count = sessions.len(), "Clearing session registry");
        sessions.clear();
    }
}
