//! Session lifecycle
//!
//! Explicit store mapping a session key to its memory: created on
//! authentication, ended on logout, idle sessions evicted on a timer
//! owned by the caller. Nothing here is global.

use crate::session::memory::SessionMemory;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
pub struct SessionStore {
    sessions: HashMap<String, SessionMemory>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for the key, replacing any existing one.
    pub fn create(&mut self, key: &str) -> &mut SessionMemory {
        let slot = self
            .sessions
            .entry(key.to_string())
            .or_insert_with(|| SessionMemory::new(key));
        *slot = SessionMemory::new(key);
        slot
    }

    /// Create a session under a freshly generated key, returning the key.
    pub fn create_anonymous(&mut self) -> String {
        let key = Uuid::new_v4().to_string();
        self.create(&key);
        key
    }

    pub fn get(&self, key: &str) -> Option<&SessionMemory> {
        self.sessions.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut SessionMemory> {
        self.sessions.get_mut(key)
    }

    /// End a session, returning its memory for any final bookkeeping.
    pub fn end(&mut self, key: &str) -> Option<SessionMemory> {
        self.sessions.remove(key)
    }

    /// Drop sessions idle longer than `max_idle`. Returns evicted count.
    pub fn evict_idle(&mut self, max_idle: Duration) -> usize {
        let cutoff = Utc::now() - max_idle;
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.last_active() >= cutoff);
        let evicted = before - self.sessions.len();
        if evicted > 0 {
            tracing::info!("evicted {evicted} idle session(s)");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::Service;
    use serde_json::Map;

    #[test]
    fn test_create_get_end() {
        let mut store = SessionStore::new();
        store.create("alice");
        assert!(store.get("alice").is_some());
        assert!(store.get("bob").is_none());

        let ended = store.end("alice");
        assert!(ended.is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn test_create_replaces_existing() {
        let mut store = SessionStore::new();
        store
            .create("alice")
            .add_command("x", Service::Mail, "search_email", Map::new(), None, true, None);
        assert_eq!(store.get("alice").unwrap().history().len(), 1);

        store.create("alice");
        assert!(store.get("alice").unwrap().history().is_empty());
    }

    #[test]
    fn test_evict_idle_keeps_active() {
        let mut store = SessionStore::new();
        store.create("alice");
        // A fresh session is within any reasonable idle window.
        assert_eq!(store.evict_idle(Duration::minutes(30)), 0);
        assert_eq!(store.len(), 1);
        // Zero-width window evicts everything.
        assert_eq!(store.evict_idle(Duration::seconds(-1)), 1);
        assert!(store.is_empty());
    }
}
