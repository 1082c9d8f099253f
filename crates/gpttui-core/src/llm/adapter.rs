use crate::constants::network;
use crate::error::{GptError, Result};
use crate::llm::traits::{BackendKind, ChatBackend, WireProtocol};
use crate::llm::transport::{HttpRequest, Transport};
use crate::session::SessionManager;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Runs turns for one provider against one session.
///
/// The wire format is delegated to `P`; the persistence order and the retry
/// loop are shared by every provider:
/// seed → append user turn (once) → read history → call with retries →
/// append assistant turn. A failed call leaves only the user turn behind.
pub struct Adapter<P: WireProtocol> {
    protocol: P,
    session: SessionManager,
    transport: Arc<dyn Transport>,
}

impl<P: WireProtocol> Adapter<P> {
    pub fn configure(protocol: P, session: SessionManager, transport: Arc<dyn Transport>) -> Self {
        Self {
            protocol,
            session,
            transport,
        }
    }

    /// Issue `request` until a usable reply arrives or the attempt budget runs out.
    async fn send_with_retry(&self, request: &HttpRequest) -> Result<String> {
        let policy = self.protocol.retry_policy();
        let attempts = policy.attempts();
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=attempts {
            let delay = policy.delay_before(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            debug!(
                "{} request attempt {}/{} to {}",
                self.protocol.kind(),
                attempt,
                attempts,
                request.url
            );

            match self.transport.post_json(request).await {
                Ok(response) if response.is_success() => {
                    return self.protocol.parse_reply(&response.body);
                }
                Ok(response) if is_retryable_status(response.status) => {
                    warn!(
                        "{} returned HTTP {} (attempt {}/{})",
                        self.protocol.kind(),
                        response.status,
                        attempt,
                        attempts
                    );
                    last_error = format!(
                        "HTTP {}: {}",
                        response.status,
                        error_message(&response.body)
                    );
                }
                Ok(response) => {
                    return Err(GptError::BackendStatus {
                        status: response.status,
                        message: error_message(&response.body),
                    });
                }
                Err(e) if e.is_transient() => {
                    warn!(
                        "{} request failed: {} (attempt {}/{})",
                        self.protocol.kind(),
                        e,
                        attempt,
                        attempts
                    );
                    last_error = e.to_string();
                }
                Err(e) => return Err(GptError::Transport(e.to_string())),
            }
        }

        Err(GptError::BackendExhausted {
            attempts,
            last_error,
        })
    }
}

#[async_trait::async_trait]
impl<P: WireProtocol> ChatBackend for Adapter<P> {
    fn kind(&self) -> BackendKind {
        self.protocol.kind()
    }

    fn session(&self) -> &SessionManager {
        &self.session
    }

    async fn converse(&self, user_text: &str) -> Result<String> {
        // Seed before the user turn so the context stays first in the log.
        self.session.ensure_history()?;
        self.session.append_user_turn(user_text)?;

        let history = self.session.ensure_history()?;
        let request = self.protocol.build_request(&history, user_text)?;

        let reply = self.send_with_retry(&request).await?;
        self.session.append_assistant_turn(&reply)?;

        info!(
            "{} replied in session '{}' ({} chars)",
            self.protocol.kind(),
            self.session.session_name(),
            reply.len()
        );
        Ok(reply)
    }
}

fn is_retryable_status(status: u16) -> bool {
    network::RETRYABLE_STATUSES.contains(&status)
}

#[derive(Deserialize)]
struct ErrorPayload {
    error: Option<ErrorFields>,
}

#[derive(Deserialize)]
struct ErrorFields {
    message: Option<String>,
}

/// Best-effort human message from an error body: `{"error": {"message": ..}}`
/// when present, otherwise the raw body.
fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .and_then(|p| p.error)
        .and_then(|e| e.message)
        .filter(|m| !m.trim().is_empty());

    match parsed {
        Some(message) => message,
        None if body.trim().is_empty() => "empty response body".to_string(),
        None => body.trim().to_string(),
    }
}
