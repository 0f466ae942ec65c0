//! Session persistence boundary.
//!
//! The engine never mutates stored state in place: it loads a session,
//! transforms the copy, and commits by saving. A failed save therefore
//! leaves the stored record untouched.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

use crate::error::{GameError, GameResult};
use crate::types::{Session, SessionId};

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a freshly created session.
    async fn create(&self, session: &Session) -> GameResult<()>;

    /// Load a session by id. Unknown ids are `NotFound`; documents that
    /// fail validation are `Store` errors (fail closed).
    async fn load(&self, id: &str) -> GameResult<Session>;

    /// Persist the full current state of a session.
    async fn save(&self, session: &Session) -> GameResult<()>;
}

/// In-memory store, the default for a single-process deployment.
#[derive(Default)]
pub struct MemStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemStore {
    async fn create(&self, session: &Session) -> GameResult<()> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn load(&self, id: &str) -> GameResult<Session> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(GameError::NotFound)
    }

    async fn save(&self, session: &Session) -> GameResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }
}

/// Document-per-session store: one JSON file per session id under a data
/// directory. Loads go through serde validation, so a hand-edited or
/// truncated document is rejected rather than half-read.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, id: &str) -> GameResult<PathBuf> {
        // Session ids are ULIDs; refuse anything that could escape the dir.
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(GameError::NotFound);
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    async fn write_doc(&self, session: &Session) -> GameResult<()> {
        let path = self.path_for(&session.id)?;
        let json = serde_json::to_vec_pretty(session)
            .map_err(|e| GameError::Store(format!("serialize session: {e}")))?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| GameError::Store(format!("create data dir: {e}")))?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| GameError::Store(format!("write session document: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn create(&self, session: &Session) -> GameResult<()> {
        self.write_doc(session).await
    }

    async fn load(&self, id: &str) -> GameResult<Session> {
        let path = self.path_for(id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(GameError::NotFound),
            Err(e) => return Err(GameError::Store(format!("read session document: {e}"))),
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| GameError::Store(format!("invalid session document: {e}")))
    }

    async fn save(&self, session: &Session) -> GameResult<()> {
        self.write_doc(session).await
    }
}
