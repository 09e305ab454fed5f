//! Session registry
//!
//! Tracks every live WebSocket connection. The map lock is only held for the
//! insert/remove/read itself, never across an `.await`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

pub type SessionId = Uuid;

/// One open socket
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    peer: Option<SocketAddr>,
    connected_at: DateTime<Utc>,
    /// true while registered
    alive: AtomicBool,
}

impl SessionHandle {
    pub fn new(peer: Option<SocketAddr>) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer,
            connected_at: Utc::now(),
            alive: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

/// Snapshot of a registered session
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub peer: Option<String>,
    pub connected_at: DateTime<Utc>,
}

impl From<&SessionHandle> for SessionInfo {
    fn from(handle: &SessionHandle) -> Self {
        Self {
            id: handle.id,
            peer: handle.peer.map(|addr| addr.to_string()),
            connected_at: handle.connected_at,
        }
    }
}

/// 活跃会话注册表
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<SessionId, Arc<SessionHandle>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session; it stays registered until the returned guard drops.
    #[must_use = "dropping the guard unregisters the session immediately"]
    pub fn register(&self, handle: SessionHandle) -> SessionGuard {
        let handle = Arc::new(handle);
        handle.alive.store(true, Ordering::Release);
        self.sessions.lock().insert(handle.id, Arc::clone(&handle));

        debug!(session_id = %handle.id, "session registered");

        SessionGuard {
            registry: self.clone(),
            handle,
        }
    }

    /// Remove a session. Unknown ids are ignored.
    pub fn unregister(&self, id: SessionId) -> Option<Arc<SessionHandle>> {
        let removed = self.sessions.lock().remove(&id);
        if let Some(handle) = &removed {
            handle.alive.store(false, Ordering::Release);
            debug!(session_id = %id, "session unregistered");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.lock().contains_key(&id)
    }

    pub fn list(&self) -> Vec<SessionInfo> {
        self.sessions
            .lock()
            .values()
            .map(|handle| SessionInfo::from(handle.as_ref()))
            .collect()
    }
}

/// Unregisters its session on drop, on every exit path.
#[derive(Debug)]
pub struct SessionGuard {
    registry: SessionRegistry,
    handle: Arc<SessionHandle>,
}

impl SessionGuard {
    pub fn id(&self) -> SessionId {
        self.handle.id
    }

    pub fn handle(&self) -> &Arc<SessionHandle> {
        &self.handle
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.unregister(self.handle.id);
    }
}
