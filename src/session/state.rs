//! Per-user session state and the store that holds it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::WizardResult;
use crate::llm::client::{ChatMessage, ModelCatalog};
use crate::session::roster::{self, ModelConfig};
use crate::session::usage::UsageRecord;

/// One roster entry with its history and counters.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelSlot {
    /// Model configuration.
    pub config: ModelConfig,
    /// Conversation so far.
    pub history: Vec<ChatMessage>,
    /// Cumulative usage.
    pub usage: UsageRecord,
}

impl ModelSlot {
    fn new(config: ModelConfig) -> Self {
        Self {
            config,
            history: Vec::new(),
            usage: UsageRecord::default(),
        }
    }
}

/// State of one interactive session.
#[derive(Clone, Debug, Default)]
pub struct SessionState {
    credential: Option<String>,
    slots: Vec<ModelSlot>,
}

impl SessionState {
    /// Fresh session with no roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Active credential.
    #[must_use]
    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    /// Whether a key was verified and a roster established.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.credential.is_some() && !self.slots.is_empty()
    }

    /// Replace the roster and zero every counter.
    pub fn establish_roster(&mut self, credential: String, roster: Vec<ModelConfig>) {
        self.credential = Some(credential);
        self.slots = roster.into_iter().map(ModelSlot::new).collect();
    }

    /// Verify `credential` against `catalog` and establish the resulting roster.
    /// On failure the session is left unchanged.
    ///
    /// # Errors
    /// Propagates [`roster::verify_key`] failures.
    pub async fn verify_key(
        &mut self,
        catalog: &dyn ModelCatalog,
        credential: String,
        configured: &[ModelConfig],
        requested: &[String],
    ) -> WizardResult<()> {
        let roster = roster::verify_key(catalog, configured, requested).await?;
        self.establish_roster(credential, roster);
        Ok(())
    }

    /// Clear histories and usage, keeping roster and credential.
    pub fn start_new_test(&mut self) {
        for slot in &mut self.slots {
            slot.history.clear();
            slot.usage = UsageRecord::default();
        }
    }

    /// Roster models in order.
    pub fn roster(&self) -> impl Iterator<Item = &ModelConfig> {
        self.slots.iter().map(|slot| &slot.config)
    }

    /// All slots in roster order.
    #[must_use]
    pub fn slots(&self) -> &[ModelSlot] {
        &self.slots
    }

    /// Slot for one model.
    #[must_use]
    pub fn slot(&self, model_identifier: &str) -> Option<&ModelSlot> {
        self.slots
            .iter()
            .find(|slot| slot.config.identifier == model_identifier)
    }

    pub(crate) fn slot_mut(&mut self, model_identifier: &str) -> Option<&mut ModelSlot> {
        self.slots
            .iter_mut()
            .find(|slot| slot.config.identifier == model_identifier)
    }

    /// Serializable view for the presentation layer.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            ready: self.is_ready(),
            models: self.slots.clone(),
        }
    }
}

/// Read-only view of a session.
#[derive(Clone, Debug, Serialize)]
pub struct SessionSnapshot {
    /// Whether generation is enabled.
    pub ready: bool,
    /// Slots in roster order.
    pub models: Vec<ModelSlot>,
}

/// Handle to one session.
pub type SharedSession = Arc<Mutex<SessionState>>;

#[derive(Debug)]
struct SessionEntry {
    handle: SharedSession,
    last_seen: DateTime<Utc>,
}

/// All live sessions, keyed by id.
///
/// Every lookup refreshes the session's last-seen time; [`SessionStore::evict_idle`]
/// drops the sessions nobody has touched since a cutoff.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<Uuid, SessionEntry>,
}

impl SessionStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new session.
    pub fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.insert(
            id,
            SessionEntry {
                handle: Arc::new(Mutex::new(SessionState::new())),
                last_seen: Utc::now(),
            },
        );
        id
    }

    /// Look up a session and mark it as used. The map guard is released before the
    /// handle is returned.
    #[must_use]
    pub fn get(&self, id: &Uuid) -> Option<SharedSession> {
        self.sessions.get_mut(id).map(|mut entry| {
            entry.last_seen = Utc::now();
            Arc::clone(&entry.handle)
        })
    }

    /// When a session was last looked up.
    #[must_use]
    pub fn last_seen(&self, id: &Uuid) -> Option<DateTime<Utc>> {
        self.sessions.get(id).map(|entry| entry.last_seen)
    }

    /// Close a session. Returns whether it existed.
    pub fn remove(&self, id: &Uuid) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Drop every session last seen at or before `cutoff`. Returns how many were dropped.
    ///
    /// A request already holding a session handle keeps working on it; the session is
    /// only unreachable for later lookups.
    pub fn evict_idle(&self, cutoff: DateTime<Utc>) -> usize {
        let mut evicted = 0;
        self.sessions.retain(|_, entry| {
            let keep = entry.last_seen > cutoff;
            if !keep {
                evicted += 1;
            }
            keep
        });
        evicted
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::error::WizardError;
    use crate::session::roster::default_catalog;
    use async_trait::async_trait;

    struct Listing(WizardResult<Vec<String>>);

    #[async_trait]
    impl ModelCatalog for Listing {
        async fn list_models(&self) -> WizardResult<Vec<String>> {
            self.0.clone()
        }
    }

    #[test]
    fn test_start_new_test_keeps_roster() {
        let mut state = SessionState::new();
        state.establish_roster("sk-1".to_string(), default_catalog());
        let slot = state.slot_mut("gpt-4").expect("gpt-4 in roster");
        slot.history.push(ChatMessage::user("hi"));
        slot.usage.total_tokens = 42;

        state.start_new_test();
        assert!(state.is_ready());
        assert_eq!(state.roster().count(), 2);
        let slot = state.slot("gpt-4").expect("still present");
        assert!(slot.history.is_empty());
        assert!(slot.usage.is_empty());
    }

    #[tokio::test]
    async fn test_failed_verification_leaves_state() {
        let mut state = SessionState::new();
        state.establish_roster("sk-old".to_string(), default_catalog());
        state
            .slot_mut("gpt-3.5-turbo")
            .expect("present")
            .usage
            .total_tokens = 7;

        let catalog = Listing(Err(WizardError::AuthenticationFailed("nope".to_string())));
        let result = state
            .verify_key(&catalog, "sk-new".to_string(), &default_catalog(), &[])
            .await;
        assert!(result.is_err());
        assert_eq!(state.credential(), Some("sk-old"));
        assert_eq!(
            state.slot("gpt-3.5-turbo").expect("present").usage.total_tokens,
            7
        );
    }

    #[tokio::test]
    async fn test_successful_verification_resets_usage() {
        let mut state = SessionState::new();
        state.establish_roster("sk-old".to_string(), default_catalog());
        state.slot_mut("gpt-4").expect("present").usage.total_tokens = 99;

        let catalog = Listing(Ok(vec!["gpt-4".to_string(), "gpt-3.5-turbo".to_string()]));
        state
            .verify_key(&catalog, "sk-new".to_string(), &default_catalog(), &[])
            .await
            .expect("verifies");
        assert_eq!(state.credential(), Some("sk-new"));
        assert!(state.slots().iter().all(|slot| slot.usage.is_empty()));
    }

    #[test]
    fn test_store_create_and_get() {
        let store = SessionStore::new();
        assert!(store.is_empty());
        let id = store.create();
        assert_eq!(store.len(), 1);
        assert!(store.get(&id).is_some());
        assert!(store.last_seen(&id).is_some());
        assert!(store.get(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_evict_idle_drops_only_stale_sessions() {
        let store = SessionStore::new();
        let stale = store.create();
        let fresh = store.create();
        store
            .sessions
            .get_mut(&stale)
            .expect("present")
            .last_seen = Utc::now() - TimeDelta::hours(5);

        let evicted = store.evict_idle(Utc::now() - TimeDelta::hours(4));
        assert_eq!(evicted, 1);
        assert!(store.get(&stale).is_none());
        assert!(store.get(&fresh).is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_many_sessions_are_reclaimed() {
        let store = SessionStore::new();
        for _ in 0..10_000 {
            let _ = store.create();
        }
        assert_eq!(store.len(), 10_000);
        assert_eq!(store.evict_idle(Utc::now()), 10_000);
        assert!(store.is_empty());
    }

    #[test]
    fn test_lookup_refreshes_last_seen() {
        let store = SessionStore::new();
        let id = store.create();
        let old = Utc::now() - TimeDelta::hours(5);
        store.sessions.get_mut(&id).expect("present").last_seen = old;

        assert!(store.get(&id).is_some());
        assert!(store.last_seen(&id).expect("present") > old);
        assert_eq!(store.evict_idle(Utc::now() - TimeDelta::hours(4)), 0);
    }

    #[test]
    fn test_remove() {
        let store = SessionStore::new();
        let id = store.create();
        assert!(store.remove(&id));
        assert!(!store.remove(&id));
        assert!(store.get(&id).is_none());
    }
}
