//! In-memory message store. Same contract as the SQLite store, nothing survives
//! the process. Logs are keyed by the lowercased [`session_key`].

use super::{session_key, MessageStore};
use crate::error::{GptError, Result};
use crate::message::{Message, TimestampedMessage};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

type Sessions = BTreeMap<String, Vec<TimestampedMessage>>;

#[derive(Debug)]
pub struct MemoryStore {
    /// `None` once the store has been closed.
    sessions: RwLock<Option<Sessions>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            sessions: RwLock::new(Some(BTreeMap::new())),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Sessions>> {
        self.sessions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Sessions>> {
        self.sessions.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Messages of `name` sorted by timestamp. The sort is stable, so equal
    /// timestamps keep write order.
    fn sorted(&self, name: &str) -> Result<Vec<TimestampedMessage>> {
        let name = session_key(name)?;
        let guard = self.read();
        let sessions = guard.as_ref().ok_or(GptError::StoreClosed)?;
        let mut log = sessions
            .get(&name)
            .cloned()
            .ok_or_else(|| GptError::NotFound(name.clone()))?;
        log.sort_by_key(|m| m.timestamp);
        Ok(log)
    }
}

impl MessageStore for MemoryStore {
    fn create_session(&self, name: &str) -> Result<()> {
        let name = session_key(name)?;
        let mut guard = self.write();
        let sessions = guard.as_mut().ok_or(GptError::StoreClosed)?;
        sessions.entry(name).or_default();
        Ok(())
    }

    fn delete_session(&self, name: &str) -> Result<()> {
        let name = session_key(name)?;
        let mut guard = self.write();
        let sessions = guard.as_mut().ok_or(GptError::StoreClosed)?;
        sessions
            .remove(&name)
            .map(|_| ())
            .ok_or_else(|| GptError::NotFound(name.clone()))
    }

    fn append_message(&self, name: &str, message: &TimestampedMessage) -> Result<()> {
        let name = session_key(name)?;
        let mut guard = self.write();
        let sessions = guard.as_mut().ok_or(GptError::StoreClosed)?;
        let log = sessions
            .get_mut(&name)
            .ok_or_else(|| GptError::NotFound(name.clone()))?;
        log.push(message.clone());
        Ok(())
    }

    fn list_messages(&self, name: &str) -> Result<Vec<Message>> {
        Ok(self.sorted(name)?.into_iter().map(|m| m.message).collect())
    }

    fn last_message(&self, name: &str) -> Result<Option<Message>> {
        Ok(self.sorted(name)?.pop().map(|m| m.message))
    }

    fn last_timestamp(&self, name: &str) -> Result<Option<i64>> {
        Ok(self.sorted(name)?.last().map(|m| m.timestamp))
    }

    fn session_exists(&self, name: &str) -> Result<bool> {
        let name = session_key(name)?;
        let guard = self.read();
        let sessions = guard.as_ref().ok_or(GptError::StoreClosed)?;
        Ok(sessions.contains_key(&name))
    }

    fn list_sessions(&self) -> Result<Vec<String>> {
        let guard = self.read();
        let sessions = guard.as_ref().ok_or(GptError::StoreClosed)?;
        Ok(sessions.keys().cloned().collect())
    }

    fn close(&self) -> Result<()> {
        self.write().take();
        Ok(())
    }
}
