#![allow(dead_code)]

use gpttui_core::llm::{
    ChatSonicConfig, ColossalConfig, HttpRequest, HttpResponse, OpenAIConfig, RetryPolicy,
    Transport, TransportError,
};
use gpttui_core::store::MemoryStore;
use gpttui_core::{MessageStore, SessionManager};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type Outcome = Result<HttpResponse, TransportError>;

/// Transport that replays scripted outcomes and records every request.
/// Once the script is used up it keeps answering with `fallback`.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Outcome>>,
    fallback: Outcome,
    requests: Mutex<Vec<HttpRequest>>,
    delay: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Outcome>, fallback: Outcome) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            requests: Mutex::new(Vec::new()),
            delay: None,
        })
    }

    pub fn always(outcome: Outcome) -> Arc<Self> {
        Self::new(Vec::new(), outcome)
    }

    /// Like `always`, but each call sleeps first (for in-flight tests).
    pub fn slow(outcome: Outcome, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: outcome,
            requests: Mutex::new(Vec::new()),
            delay: Some(delay),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn post_json(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

pub fn no_delay_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        timeout_secs: 5,
        max_retries,
        retry_delay_ms: 0,
    }
}

pub fn openai_config(max_retries: u32) -> OpenAIConfig {
    OpenAIConfig {
        base_url: "http://localhost:8080/".into(),
        api_key: "test-key".into(),
        model: "gpt-3.5-turbo".into(),
        retry: no_delay_policy(max_retries),
        ..OpenAIConfig::default()
    }
}

pub fn chatsonic_config(max_retries: u32) -> ChatSonicConfig {
    ChatSonicConfig {
        url: "http://localhost:8080/chatsonic".into(),
        api_key: "sonic-key".into(),
        retry: no_delay_policy(max_retries),
        ..ChatSonicConfig::default()
    }
}

pub fn colossal_config(max_retries: u32) -> ColossalConfig {
    ColossalConfig {
        url: "http://localhost:8080/generate".into(),
        retry: no_delay_policy(max_retries),
        ..ColossalConfig::default()
    }
}

pub fn memory_session(name: &str, context: &str) -> (Arc<MemoryStore>, SessionManager) {
    let store = Arc::new(MemoryStore::new());
    let shared: Arc<dyn MessageStore> = store.clone();
    let session = SessionManager::new(shared, name, context).unwrap();
    (store, session)
}

pub fn openai_reply(content: &str) -> Outcome {
    Ok(HttpResponse::ok(
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        })
        .to_string(),
    ))
}
