//! Runtime for executing conversations
//!
//! Owns the per-conversation sessions and carries out the effects the state
//! machine asks for.

mod executor;
pub mod traits;


pub use executor::{ActionOutcome, ConversationRuntime, OutboundMessage};
pub use traits::*;

use crate::cowin::LoggingAvailabilityClient;
use crate::postal::{PincodeChecker, PostalClient};
use crate::state_machine::{ConvState, SessionData};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

/// Type alias for production runtime with concrete implementations
pub type ProductionRuntime =
    ConversationRuntime<PincodeChecker<PostalClient>, LoggingAvailabilityClient>;

/// One conversation's state machine position and scratch data
#[derive(Debug, Clone, Default, Serialize)]
pub struct Session {
    pub state: ConvState,
    pub data: SessionData,
}

/// In-memory sessions keyed by conversation id.
///
/// A session's mutex is held while one action is processed, so a single
/// conversation is handled strictly in order while different conversations
/// proceed concurrently. Sessions abandoned mid-conversation are dropped by
/// [`SessionStore::evict_idle`].
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionSlot>>,
    epoch: Instant,
}

struct SessionSlot {
    session: Arc<Mutex<Session>>,
    /// Milliseconds since the store's epoch
    last_active: AtomicU64,
}

impl SessionSlot {
    fn new(now: u64) -> Self {
        Self {
            session: Arc::default(),
            last_active: AtomicU64::new(now),
        }
    }

    fn touch(&self, now: u64) -> Arc<Mutex<Session>> {
        self.last_active.store(now, Ordering::Relaxed);
        self.session.clone()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self {
            sessions: RwLock::default(),
            epoch: Instant::now(),
        }
    }
}

fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn now(&self) -> u64 {
        as_millis(self.epoch.elapsed())
    }

    /// Get or create the session for a conversation
    pub async fn get_or_create(&self, conversation_id: &str) -> Arc<Mutex<Session>> {
        let now = self.now();

        // Check if already present
        {
            let sessions = self.sessions.read().await;
            if let Some(slot) = sessions.get(conversation_id) {
                return slot.touch(now);
            }
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(conversation_id.to_string())
            .or_insert_with(|| SessionSlot::new(now))
            .touch(now)
    }

    /// Drop sessions nobody has touched for at least `max_idle`.
    ///
    /// Sessions held by an in-progress action are kept. Returns how many
    /// were dropped.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = self.now();
        let max_idle = as_millis(max_idle);

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, slot| {
            let idle = now.saturating_sub(slot.last_active.load(Ordering::Relaxed));
            idle < max_idle || Arc::strong_count(&slot.session) > 1
        });
        before - sessions.len()
    }

    /// Drop a finished conversation's session.
    ///
    /// Kept if anyone else still holds it or it has moved on since.
    pub async fn release(&self, conversation_id: &str) {
        let mut sessions = self.sessions.write().await;
        let removable = sessions.get(conversation_id).is_some_and(|slot| {
            Arc::strong_count(&slot.session) == 1
                && slot
                    .session
                    .try_lock()
                    .is_ok_and(|guard| guard.state.is_finished())
        });
        if removable {
            sessions.remove(conversation_id);
        }
    }

    /// Copy of the session, if the conversation is active
    pub async fn snapshot(&self, conversation_id: &str) -> Option<Session> {
        let session = self
            .sessions
            .read()
            .await
            .get(conversation_id)
            .map(|slot| slot.session.clone())?;
        let guard = session.lock().await;
        Some(guard.clone())
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
