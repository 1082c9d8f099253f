use crate::constants::network;
use crate::error::Result;
use crate::llm::transport::HttpRequest;
use crate::llm::{ChatSonicConfig, ColossalConfig, OpenAIConfig};
use crate::message::Message;
use crate::session::SessionManager;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Identifies a model provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    OpenAI,
    ChatSonic,
    Colossal,
}

impl BackendKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::ChatSonic => "ChatSonic",
            Self::Colossal => "Colossal",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "chatsonic" => Ok(Self::ChatSonic),
            "colossal" => Ok(Self::Colossal),
            other => Err(format!(
                "unknown backend '{other}' (expected openai, chatsonic or colossal)"
            )),
        }
    }
}

/// Timeout and retry budget of one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Per-request timeout in seconds; `0` disables the timeout.
    pub timeout_secs: u64,
    /// Total number of attempts per turn; `0` is treated as `1`.
    pub max_retries: u32,
    /// Base delay before a retry, doubled on every further attempt.
    pub retry_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout_secs: network::TIMEOUT_SECS,
            max_retries: network::MAX_RETRIES,
            retry_delay_ms: network::RETRY_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Delay to wait before `attempt` (1-based). The first attempt never waits.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 || self.retry_delay_ms == 0 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2).min(network::MAX_BACKOFF_EXPONENT);
        Duration::from_millis(self.retry_delay_ms.saturating_mul(2u64.pow(exponent)))
    }
}

/// Provider configuration handed to an adapter. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendConfig {
    OpenAI(OpenAIConfig),
    ChatSonic(ChatSonicConfig),
    Colossal(ColossalConfig),
}

impl BackendConfig {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::OpenAI(_) => BackendKind::OpenAI,
            Self::ChatSonic(_) => BackendKind::ChatSonic,
            Self::Colossal(_) => BackendKind::Colossal,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        match self {
            Self::OpenAI(c) => &c.retry,
            Self::ChatSonic(c) => &c.retry,
            Self::Colossal(c) => &c.retry,
        }
    }
}

/// How one provider shapes requests and replies on the wire.
pub trait WireProtocol: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn retry_policy(&self) -> &RetryPolicy;

    /// Build the request for `user_text`. `history` is the full ordered
    /// session log and already ends with the new user turn.
    fn build_request(&self, history: &[Message], user_text: &str) -> Result<HttpRequest>;

    /// Extract the assistant reply from a successful response body.
    fn parse_reply(&self, body: &str) -> Result<String>;
}

/// A configured model backend bound to one session.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn session(&self) -> &SessionManager;

    /// Run one turn: persist the user text, call the provider, persist and
    /// return the reply.
    async fn converse(&self, user_text: &str) -> Result<String>;
}
