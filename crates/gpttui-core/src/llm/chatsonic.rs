use crate::constants::{endpoints, env};
use crate::error::{GptError, Result};
use crate::llm::traits::{BackendKind, RetryPolicy, WireProtocol};
use crate::llm::transport::HttpRequest;
use crate::message::{Message, Role};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSonicConfig {
    pub url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    pub api_key_env: String,
    pub enable_memory: bool,
    pub enable_google_results: bool,
    #[serde(flatten)]
    pub retry: RetryPolicy,
}

impl Default for ChatSonicConfig {
    fn default() -> Self {
        Self {
            url: endpoints::CHATSONIC_URL.to_string(),
            api_key: String::new(),
            api_key_env: env::CHATSONIC_API_KEY.to_string(),
            enable_memory: true,
            enable_google_results: true,
            retry: RetryPolicy::default(),
        }
    }
}

/// One turn of ChatSonic's `history_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSonicMessage {
    pub is_sent: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct ChatSonicRequest<'a> {
    enable_memory: bool,
    enable_google_results: bool,
    input_text: &'a str,
    history_data: Vec<ChatSonicMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatSonicResponse {
    message: Option<String>,
}

pub struct ChatSonicClient {
    config: ChatSonicConfig,
}

impl ChatSonicClient {
    pub fn new(config: ChatSonicConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(GptError::Config(format!(
                "ChatSonic API key is missing; set {} or chatsonic.api_key",
                config.api_key_env
            )));
        }
        Ok(Self { config })
    }
}

/// System messages are dropped; user turns are "sent", assistant turns are not.
fn to_history_data(history: &[Message]) -> Vec<ChatSonicMessage> {
    history
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| ChatSonicMessage {
            is_sent: m.role == Role::User,
            message: m.content.clone(),
        })
        .collect()
}

impl WireProtocol for ChatSonicClient {
    fn kind(&self) -> BackendKind {
        BackendKind::ChatSonic
    }

    fn retry_policy(&self) -> &RetryPolicy {
        &self.config.retry
    }

    fn build_request(&self, history: &[Message], user_text: &str) -> Result<HttpRequest> {
        let body = ChatSonicRequest {
            enable_memory: self.config.enable_memory,
            enable_google_results: self.config.enable_google_results,
            input_text: user_text,
            history_data: to_history_data(history),
        };

        Ok(
            HttpRequest::post(&self.config.url, serde_json::to_value(&body)?)
                .with_header("accept", "application/json")
                .with_header("X-API-KEY", &self.config.api_key)
                .with_timeout(self.config.retry.timeout()),
        )
    }

    fn parse_reply(&self, body: &str) -> Result<String> {
        let response: ChatSonicResponse = serde_json::from_str(body)
            .map_err(|e| GptError::protocol(format!("Failed to parse ChatSonic response: {e}")))?;
        response
            .message
            .ok_or_else(|| GptError::protocol("ChatSonic response has no 'message' field"))
    }
}
