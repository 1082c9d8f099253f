use crate::error::{GptError, Result};
use crate::message::{Message, TimestampedMessage};
use crate::store::{validate_session_name, MessageStore};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Owns the lifecycle of one named session on top of a [`MessageStore`]:
/// create on first use, seed with the system context, append turns.
///
/// Clones share the store and the timestamp clock, so every writer for the
/// session stamps monotonically. The clock never runs below the newest stored
/// stamp, even if the wall clock has stepped back since it was written.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn MessageStore>,
    session_name: String,
    context: String,
    last_timestamp: Arc<AtomicI64>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn MessageStore>,
        session_name: impl Into<String>,
        context: impl Into<String>,
    ) -> Result<Self> {
        let session_name = session_name.into();
        validate_session_name(&session_name)?;
        Ok(Self {
            store,
            session_name,
            context: context.into(),
            last_timestamp: Arc::new(AtomicI64::new(i64::MIN)),
        })
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    /// Ordered history of the session, never empty.
    ///
    /// An empty session is seeded with the context as a `system` message and
    /// read once more. If the seed is still not visible the call fails with
    /// [`GptError::EmptySession`] instead of looping.
    pub fn ensure_history(&self) -> Result<Vec<Message>> {
        self.store.create_session(&self.session_name)?;

        let history = self.store.list_messages(&self.session_name)?;
        if !history.is_empty() {
            return Ok(history);
        }

        info!("Seeding session '{}' with context", self.session_name);
        self.append(Message::system(self.context.clone()))?;

        let history = self.store.list_messages(&self.session_name)?;
        if history.is_empty() {
            return Err(GptError::EmptySession(self.session_name.clone()));
        }
        Ok(history)
    }

    pub fn append_user_turn(&self, text: &str) -> Result<()> {
        self.append(Message::user(text))
    }

    pub fn append_assistant_turn(&self, text: &str) -> Result<()> {
        self.append(Message::assistant(text))
    }

    /// Most recent message of the session.
    pub fn last_message(&self) -> Result<Message> {
        self.store
            .last_message(&self.session_name)?
            .ok_or_else(|| GptError::EmptySession(self.session_name.clone()))
    }

    fn append(&self, message: Message) -> Result<()> {
        let stored = self.store.last_timestamp(&self.session_name)?;
        let timestamp = self.next_timestamp(stored);
        debug!(
            "Appending {} message to '{}' at {}",
            message.role, self.session_name, timestamp
        );
        self.store
            .append_message(&self.session_name, &TimestampedMessage::new(message, timestamp))
    }

    /// Wall-clock seconds, never lower than the previous stamp of this manager
    /// or the newest stamp already in the log.
    fn next_timestamp(&self, stored: Option<i64>) -> i64 {
        let now = chrono::Utc::now()
            .timestamp()
            .max(stored.unwrap_or(i64::MIN));
        let previous = self.last_timestamp.fetch_max(now, Ordering::SeqCst);
        previous.max(now)
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("session_name", &self.session_name)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
