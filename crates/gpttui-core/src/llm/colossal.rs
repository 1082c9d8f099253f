use crate::constants::{colossal, endpoints, network};
use crate::error::{GptError, Result};
use crate::llm::traits::{BackendKind, RetryPolicy, WireProtocol};
use crate::llm::transport::HttpRequest;
use crate::message::{Message, Role};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColossalConfig {
    pub url: String,
    pub repetition_penalty: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub temperature: f32,
    pub max_new_tokens: u32,
    /// The public demo endpoint serves a self-signed certificate.
    pub accept_invalid_certs: bool,
    #[serde(flatten)]
    pub retry: RetryPolicy,
}

impl Default for ColossalConfig {
    fn default() -> Self {
        Self {
            url: endpoints::COLOSSAL_URL.to_string(),
            repetition_penalty: colossal::REPETITION_PENALTY,
            top_k: colossal::TOP_K,
            top_p: colossal::TOP_P,
            temperature: colossal::TEMPERATURE,
            max_new_tokens: colossal::MAX_NEW_TOKENS,
            accept_invalid_certs: true,
            retry: RetryPolicy {
                timeout_secs: network::COLOSSAL_TIMEOUT_SECS,
                ..RetryPolicy::default()
            },
        }
    }
}

/// One `{instruction, response}` exchange of Colossal's `history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColossalTurn {
    pub instruction: String,
    pub response: String,
}

#[derive(Debug, Serialize)]
struct ColossalRequest {
    repetition_penalty: f32,
    top_k: u32,
    top_p: f32,
    temperature: f32,
    max_new_tokens: u32,
    history: Vec<ColossalTurn>,
}

pub struct ColossalClient {
    config: ColossalConfig,
}

impl ColossalClient {
    pub fn new(config: ColossalConfig) -> Self {
        Self { config }
    }
}

/// Pair the n-th user turn with the n-th assistant turn; anything left
/// unpaired is dropped. The new input goes last with an empty response.
fn to_history(history: &[Message], user_text: &str) -> Vec<ColossalTurn> {
    let users = history.iter().filter(|m| m.role == Role::User);
    let assistants = history.iter().filter(|m| m.role == Role::Assistant);

    let mut turns: Vec<ColossalTurn> = users
        .zip(assistants)
        .map(|(u, a)| ColossalTurn {
            instruction: u.content.clone(),
            response: a.content.clone(),
        })
        .collect();
    turns.push(ColossalTurn {
        instruction: user_text.to_string(),
        response: String::new(),
    });
    turns
}

impl WireProtocol for ColossalClient {
    fn kind(&self) -> BackendKind {
        BackendKind::Colossal
    }

    fn retry_policy(&self) -> &RetryPolicy {
        &self.config.retry
    }

    fn build_request(&self, history: &[Message], user_text: &str) -> Result<HttpRequest> {
        let body = ColossalRequest {
            repetition_penalty: self.config.repetition_penalty,
            top_k: self.config.top_k,
            top_p: self.config.top_p,
            temperature: self.config.temperature,
            max_new_tokens: self.config.max_new_tokens,
            history: to_history(history, user_text),
        };

        Ok(
            HttpRequest::post(&self.config.url, serde_json::to_value(&body)?)
                .with_timeout(self.config.retry.timeout()),
        )
    }

    /// The endpoint answers with the generated text as the raw body.
    fn parse_reply(&self, body: &str) -> Result<String> {
        if body.trim().is_empty() {
            return Err(GptError::protocol("Colossal returned an empty body"));
        }
        Ok(body.to_string())
    }
}
