mod round;
mod score;
mod session;
mod vote;

pub use round::{
    advance_from_revealing, begin_answering, begin_voting, enter_revealing, force_end,
};
pub use score::apply_round_scores;
pub use vote::tally;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use tokio::sync::{broadcast, Mutex, RwLock};

use crate::error::GameResult;
use crate::prompts::{BuiltinPrompts, PromptSource};
use crate::protocol::ServerMessage;
use crate::store::{MemStore, SessionStore};
use crate::types::{GameStage, SessionId};

/// Pending-timer key: the (round, stage) whose deadline the timer fires.
type TimerKey = (u32, GameStage);

/// Per-session runtime state: the serialization point for all mutations,
/// the broadcast group, and the pending phase timers.
pub struct SessionHandle {
    /// Every mutation of this session's record happens under this lock,
    /// so no two phase transitions can interleave within a session.
    pub lock: Mutex<()>,
    updates: broadcast::Sender<ServerMessage>,
    timers: StdMutex<HashMap<TimerKey, tokio::task::JoinHandle<()>>>,
}

impl SessionHandle {
    fn new() -> Self {
        let (tx, _rx) = broadcast::channel(64);
        Self {
            lock: Mutex::new(()),
            updates: tx,
            timers: StdMutex::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.updates.subscribe()
    }

    /// Send to the whole group. No receivers connected is fine.
    pub fn send(&self, msg: ServerMessage) {
        let _ = self.updates.send(msg);
    }

    pub(crate) fn insert_timer(&self, key: TimerKey, task: tokio::task::JoinHandle<()>) {
        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(old) = timers.insert(key, task) {
            old.abort();
        }
    }

    pub(crate) fn remove_timer(&self, key: &TimerKey) {
        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        timers.remove(key);
    }

    /// Abort every pending phase timer for this session.
    pub(crate) fn cancel_timers(&self) {
        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        for (_, task) in timers.drain() {
            task.abort();
        }
    }

    #[cfg(test)]
    pub(crate) fn pending_timers(&self) -> usize {
        self.timers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Shared application state: the store, the prompt source, and the
/// registry of live session handles.
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub prompts: Arc<dyn PromptSource>,
    sessions: RwLock<HashMap<SessionId, Arc<SessionHandle>>>,
}

impl AppState {
    pub fn new(store: Arc<dyn SessionStore>, prompts: Arc<dyn PromptSource>) -> Self {
        Self {
            store,
            prompts,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Default wiring: in-memory store, built-in prompt pairs.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemStore::new()), Arc::new(BuiltinPrompts::new()))
    }

    /// Get or create the runtime handle for a session id.
    pub async fn handle(&self, id: &str) -> Arc<SessionHandle> {
        if let Some(handle) = self.sessions.read().await.get(id) {
            return handle.clone();
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(SessionHandle::new()))
            .clone()
    }

    /// Subscribe a connection to a session's broadcast group.
    pub async fn subscribe(&self, id: &str) -> broadcast::Receiver<ServerMessage> {
        self.handle(id).await.subscribe()
    }

    /// Drop a finished session's runtime handle so the registry does
    /// not grow without bound. Subscribers still drain the buffered
    /// final snapshot before their channel closes.
    pub(crate) async fn drop_handle(&self, id: &str) {
        if let Some(handle) = self.sessions.write().await.remove(id) {
            handle.cancel_timers();
        }
    }

    #[cfg(test)]
    pub(crate) async fn has_handle(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// Current snapshot for late-join catch-up.
    pub async fn session_snapshot(&self, id: &str) -> GameResult<ServerMessage> {
        let session = self.store.load(id).await?;
        Ok(ServerMessage::snapshot(&session))
    }

    pub(crate) async fn broadcast_snapshot(&self, session: &crate::types::Session) {
        self.handle(&session.id)
            .await
            .send(ServerMessage::snapshot(session));
    }
}
