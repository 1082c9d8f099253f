use crate::error::{GptError, Result};
use crate::llm::{BackendKind, ChatBackend};
use crate::message::Message;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Single entry point for the UI: one turn at a time against one session.
pub struct ConversationController {
    backend: Box<dyn ChatBackend>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag on every exit path of `submit`.
struct TurnGuard<'a>(&'a AtomicBool);

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ConversationController {
    pub fn new(backend: Box<dyn ChatBackend>) -> Self {
        Self {
            backend,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn session_name(&self) -> &str {
        self.backend.session().session_name()
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Send `text` and return the assistant reply.
    ///
    /// On failure the user turn stays persisted and no assistant turn is
    /// written. A second call while one is running fails with
    /// [`GptError::TurnInProgress`].
    pub async fn submit(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(GptError::EmptyInput);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(GptError::TurnInProgress);
        }
        let _guard = TurnGuard(&self.in_flight);

        debug!("Submitting turn to {}", self.backend.kind());
        self.backend.converse(text).await
    }

    /// Ordered history of the session, seeding it if needed.
    pub fn history(&self) -> Result<Vec<Message>> {
        self.backend.session().ensure_history()
    }

    /// Most recent message of the session (clipboard yank).
    pub fn last_reply(&self) -> Result<Message> {
        self.backend.session().last_message()
    }

    /// Release the message store. Later calls fail with `StoreClosed`.
    pub fn shutdown(&self) -> Result<()> {
        info!("Closing store for session '{}'", self.session_name());
        self.backend.session().store().close()
    }
}
