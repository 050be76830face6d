use crate::error::Result;
use crate::ids::string_to_uuid;
use crate::storage::{room_key, SharedStore, LAST_AGENT_KEY, ONBOARDING_KEY};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// Source of epoch milliseconds used to seed new rooms.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Caller identity for a chat exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    /// Wallet address or other operator id. Generated per send when absent.
    pub user_id: Option<String>,
    pub agent_id: Option<String>,
}

impl SessionContext {
    pub fn new(user_id: Option<String>, agent_id: Option<String>) -> Self {
        Self { user_id, agent_id }
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Maps agents to persisted conversation rooms.
#[derive(Clone)]
pub struct SessionManager {
    store: SharedStore,
    clock: Clock,
}

impl SessionManager {
    pub fn new(store: SharedStore) -> Self {
        Self::with_clock(store, Arc::new(|| Utc::now().timestamp_millis()))
    }

    pub fn with_clock(store: SharedStore, clock: Clock) -> Self {
        Self { store, clock }
    }

    /// Stored room for `agent_id`, without creating one.
    pub fn room_id(&self, agent_id: &str) -> Option<String> {
        self.store.get(&room_key(agent_id))
    }

    /// Stored room for `agent_id`, deriving and persisting a new one if absent.
    pub fn get_or_create_room_id(&self, agent_id: &str) -> Result<String> {
        if let Some(room_id) = self.room_id(agent_id) {
            return Ok(room_id);
        }

        let seed = format!("room-{}-{}", agent_id, (self.clock)());
        let room_id = string_to_uuid(&seed);
        self.store.set(&room_key(agent_id), &room_id)?;
        info!(agent_id, room_id = %room_id, "created conversation room");

        Ok(room_id)
    }

    /// Forget the room for `agent_id`; the next send starts a new one.
    pub fn invalidate(&self, agent_id: &str) -> Result<()> {
        if self.room_id(agent_id).is_some() {
            info!(agent_id, "clearing stored conversation room");
        }
        self.store.remove(&room_key(agent_id))
    }

    pub fn last_agent_id(&self) -> Option<String> {
        self.store.get(LAST_AGENT_KEY).filter(|id| !id.is_empty())
    }

    pub fn remember_agent(&self, agent_id: &str) -> Result<()> {
        self.store.set(LAST_AGENT_KEY, agent_id)
    }

    pub fn has_seen_onboarding(&self) -> bool {
        self.store.get(ONBOARDING_KEY).as_deref() == Some("true")
    }

    pub fn mark_onboarding_seen(&self) -> Result<()> {
        self.store.set(ONBOARDING_KEY, "true")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn manager() -> SessionManager {
        SessionManager::with_clock(Arc::new(MemoryStore::new()), Arc::new(|| 1_700_000_000_000i64))
    }

    #[test]
    fn room_creation_is_idempotent() {
        let sessions = manager();
        assert!(sessions.room_id("agent-42").is_none());

        let first = sessions.get_or_create_room_id("agent-42").unwrap();
        let second = sessions.get_or_create_room_id("agent-42").unwrap();
        assert_eq!(first, second);
        assert_eq!(sessions.room_id("agent-42"), Some(first));
    }

    #[test]
    fn rooms_are_per_agent() {
        let sessions = manager();
        let a = sessions.get_or_create_room_id("agent-a").unwrap();
        let b = sessions.get_or_create_room_id("agent-b").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn invalidate_forces_a_fresh_room() {
        let now = Arc::new(AtomicI64::new(1_700_000_000_000));
        let ticks = Arc::clone(&now);
        let sessions = SessionManager::with_clock(
            Arc::new(MemoryStore::new()),
            Arc::new(move || ticks.load(Ordering::SeqCst)),
        );
        let first = sessions.get_or_create_room_id("agent-42").unwrap();

        sessions.invalidate("agent-42").unwrap();
        assert!(sessions.room_id("agent-42").is_none());

        now.store(1_700_000_000_001, Ordering::SeqCst);
        let second = sessions.get_or_create_room_id("agent-42").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn created_rooms_have_uuid_markers() {
        let sessions = manager();
        let room = sessions.get_or_create_room_id("agent-42").unwrap();
        assert_eq!(room, string_to_uuid("room-agent-42-1700000000000"));
        assert_eq!(room.len(), 36);
        assert_eq!(&room[14..15], "4");
        assert!(matches!(&room[19..20], "8" | "9" | "a" | "b"));
    }

    #[test]
    fn remembers_last_agent_and_onboarding() {
        let sessions = manager();
        assert!(sessions.last_agent_id().is_none());
        assert!(!sessions.has_seen_onboarding());

        sessions.remember_agent("agent-7").unwrap();
        sessions.mark_onboarding_seen().unwrap();

        assert_eq!(sessions.last_agent_id().as_deref(), Some("agent-7"));
        assert!(sessions.has_seen_onboarding());
    }
}
