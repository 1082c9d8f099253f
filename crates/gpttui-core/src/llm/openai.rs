use crate::constants::{defaults, endpoints, env};
use crate::error::{GptError, Result};
use crate::llm::traits::{BackendKind, RetryPolicy, WireProtocol};
use crate::llm::transport::HttpRequest;
use crate::message::{Message, Role};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAIConfig {
    pub base_url: String,
    /// Inline key. When empty the key is read from `api_key_env` at startup.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    pub api_key_env: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    pub organization_env: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(flatten)]
    pub retry: RetryPolicy,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: endpoints::OPENAI_BASE_URL.to_string(),
            api_key: String::new(),
            api_key_env: env::OPENAI_API_KEY.to_string(),
            organization: None,
            organization_env: env::OPENAI_ORG.to_string(),
            model: defaults::OPENAI_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
            retry: RetryPolicy::default(),
        }
    }
}

/// OpenAI chat-completions wire format. History is sent unchanged, system
/// message included.
pub struct OpenAIClient {
    config: OpenAIConfig,
}

impl OpenAIClient {
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(GptError::Config(format!(
                "OpenAI API key is missing; set {} or openai.api_key",
                config.api_key_env
            )));
        }
        Ok(Self { config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIReply,
}

#[derive(Debug, Deserialize)]
struct OpenAIReply {
    content: Option<String>,
}

impl WireProtocol for OpenAIClient {
    fn kind(&self) -> BackendKind {
        BackendKind::OpenAI
    }

    fn retry_policy(&self) -> &RetryPolicy {
        &self.config.retry
    }

    fn build_request(&self, history: &[Message], _user_text: &str) -> Result<HttpRequest> {
        let body = OpenAIRequest {
            model: &self.config.model,
            messages: history
                .iter()
                .map(|m| OpenAIMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let mut request = HttpRequest::post(self.endpoint(), serde_json::to_value(&body)?)
            .with_header("Authorization", format!("Bearer {}", self.config.api_key))
            .with_timeout(self.config.retry.timeout());
        if let Some(org) = self.config.organization.as_deref().filter(|o| !o.is_empty()) {
            request = request.with_header("OpenAI-Organization", org);
        }
        Ok(request)
    }

    fn parse_reply(&self, body: &str) -> Result<String> {
        let response: OpenAIResponse = serde_json::from_str(body)
            .map_err(|e| GptError::protocol(format!("Failed to parse OpenAI response: {e}")))?;

        response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GptError::protocol("OpenAI response has no choices"))?
            .message
            .content
            .ok_or_else(|| GptError::protocol("OpenAI reply has no content"))
    }
}
