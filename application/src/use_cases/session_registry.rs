//! Explicit table of sessions that currently have a running loop
//!
//! Owned by whoever wires the application together and handed to the
//! orchestrator (and, optionally, to stores), so several orchestrators can
//! share one table and tests get a fresh one each time.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    active: Arc<Mutex<HashSet<String>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `session_id` active; `None` if it already is
    ///
    /// The session stays active until the returned guard is dropped.
    pub fn try_activate(&self, session_id: &str) -> Option<ActiveSessionGuard> {
        if !self.lock().insert(session_id.to_string()) {
            return None;
        }
        debug!(session_id, "Session activated");
        Some(ActiveSessionGuard {
            registry: self.clone(),
            session_id: session_id.to_string(),
        })
    }

    pub fn is_active(&self, session_id: &str) -> bool {
        self.lock().contains(session_id)
    }

    pub fn active_sessions(&self) -> Vec<String> {
        let mut sessions: Vec<_> = self.lock().iter().cloned().collect();
        sessions.sort();
        sessions
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        // the set stays consistent even if a holder panicked
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Keeps a session active for as long as it lives
#[derive(Debug)]
pub struct ActiveSessionGuard {
    registry: SessionRegistry,
    session_id: String,
}

impl ActiveSessionGuard {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl Drop for ActiveSessionGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.session_id);
        debug!(session_id = %self.session_id, "Session released");
    }
}
