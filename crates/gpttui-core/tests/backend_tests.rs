mod support;

use gpttui_core::llm::{
    configure, configure_with_transport, Adapter, ChatSonicClient, ColossalClient, HttpResponse,
    OpenAIClient, OpenAIConfig, RetryPolicy, TransportError, WireProtocol,
};
use gpttui_core::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use support::*;

fn openai_backend(
    max_retries: u32,
    transport: Arc<ScriptedTransport>,
) -> (Arc<gpttui_core::store::MemoryStore>, Box<dyn ChatBackend>) {
    let (store, session) = memory_session("test", "You are an AI assistant");
    let backend = configure_with_transport(
        BackendConfig::OpenAI(openai_config(max_retries)),
        session,
        transport,
    )
    .unwrap();
    (store, backend)
}

// ========================================================================
// Persistence around a turn
// ========================================================================

#[tokio::test]
async fn test_successful_turn_persists_seed_user_and_reply() {
    let transport = ScriptedTransport::always(openai_reply("Hi there"));
    let (store, backend) = openai_backend(3, transport.clone());

    let reply = backend.converse("Hello").await.unwrap();

    assert_eq!(reply, "Hi there");
    assert_eq!(transport.calls(), 1);
    assert_eq!(
        store.list_messages("test").unwrap(),
        vec![
            Message::system("You are an AI assistant"),
            Message::user("Hello"),
            Message::assistant("Hi there"),
        ]
    );
}

#[tokio::test]
async fn test_second_turn_sends_full_history() {
    let transport = ScriptedTransport::new(vec![openai_reply("one")], openai_reply("two"));
    let (_store, backend) = openai_backend(3, transport.clone());

    backend.converse("first").await.unwrap();
    backend.converse("second").await.unwrap();

    let body = transport.last_request().body;
    assert_eq!(
        body["messages"],
        json!([
            {"role": "system", "content": "You are an AI assistant"},
            {"role": "user", "content": "first"},
            {"role": "assistant", "content": "one"},
            {"role": "user", "content": "second"},
        ])
    );
}

// ========================================================================
// Retry protocol
// ========================================================================

#[tokio::test]
async fn test_timeouts_exhaust_after_max_retries() {
    let transport = ScriptedTransport::always(Err(TransportError::Timeout));
    let (store, backend) = openai_backend(3, transport.clone());

    let err = backend.converse("Hello").await.unwrap_err();

    assert!(
        matches!(err, GptError::BackendExhausted { attempts: 3, .. }),
        "{err}"
    );
    assert_eq!(transport.calls(), 3);
    // User turn stays, no assistant turn is written.
    assert_eq!(
        store.list_messages("test").unwrap(),
        vec![
            Message::system("You are an AI assistant"),
            Message::user("Hello"),
        ]
    );
}

#[tokio::test]
async fn test_retries_reissue_the_identical_request() {
    let transport = ScriptedTransport::always(Err(TransportError::Timeout));
    let (_store, backend) = openai_backend(3, transport.clone());

    let _ = backend.converse("Hello").await;

    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| r == &requests[0]));
}

#[tokio::test]
async fn test_one_timeout_then_success_persists_once() {
    let transport = ScriptedTransport::new(
        vec![Err(TransportError::Timeout)],
        openai_reply("recovered"),
    );
    let (store, backend) = openai_backend(3, transport.clone());

    let reply = backend.converse("Hello").await.unwrap();

    assert_eq!(reply, "recovered");
    assert_eq!(transport.calls(), 2);
    let history = store.list_messages("test").unwrap();
    assert_eq!(history.iter().filter(|m| m.role == Role::User).count(), 1);
    assert_eq!(history.iter().filter(|m| m.role == Role::Assistant).count(), 1);
}

#[tokio::test]
async fn test_connect_errors_and_retryable_statuses_are_retried() {
    let transport = ScriptedTransport::new(
        vec![
            Err(TransportError::Connect("connection refused".into())),
            Ok(HttpResponse::new(503, "service unavailable")),
        ],
        openai_reply("finally"),
    );
    let (_store, backend) = openai_backend(3, transport.clone());

    assert_eq!(backend.converse("Hello").await.unwrap(), "finally");
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn test_rate_limit_exhaustion_reports_last_status() {
    let transport = ScriptedTransport::always(Ok(HttpResponse::new(
        429,
        r#"{"error": {"message": "Rate limit reached"}}"#,
    )));
    let (_store, backend) = openai_backend(2, transport.clone());

    match backend.converse("Hello").await.unwrap_err() {
        GptError::BackendExhausted {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 2);
            assert!(last_error.contains("429"), "{last_error}");
            assert!(last_error.contains("Rate limit reached"), "{last_error}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_non_retryable_status_fails_immediately() {
    let transport = ScriptedTransport::always(Ok(HttpResponse::new(
        401,
        r#"{"error": {"message": "Incorrect API key provided"}}"#,
    )));
    let (store, backend) = openai_backend(3, transport.clone());

    let err = backend.converse("Hello").await.unwrap_err();

    assert!(
        matches!(err, GptError::BackendStatus { status: 401, ref message } if message == "Incorrect API key provided"),
        "{err}"
    );
    assert_eq!(transport.calls(), 1);
    assert_eq!(store.last_message("test").unwrap(), Some(Message::user("Hello")));
}

#[tokio::test]
async fn test_non_transient_transport_error_fails_immediately() {
    let transport = ScriptedTransport::always(Err(TransportError::Other("bad url".into())));
    let (_store, backend) = openai_backend(3, transport.clone());

    let err = backend.converse("Hello").await.unwrap_err();
    assert!(matches!(err, GptError::Transport(_)), "{err}");
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_malformed_reply_is_protocol_error_without_retry() {
    let transport = ScriptedTransport::always(Ok(HttpResponse::ok(r#"{"choices": []}"#)));
    let (store, backend) = openai_backend(3, transport.clone());

    let err = backend.converse("Hello").await.unwrap_err();

    assert!(matches!(err, GptError::BackendProtocol(_)), "{err}");
    assert_eq!(transport.calls(), 1);
    let history = store.list_messages("test").unwrap();
    assert!(history.iter().all(|m| m.role != Role::Assistant));
}

#[tokio::test]
async fn test_zero_max_retries_still_makes_one_attempt() {
    let transport = ScriptedTransport::always(Err(TransportError::Timeout));
    let (_store, backend) = openai_backend(0, transport.clone());

    let err = backend.converse("Hello").await.unwrap_err();
    assert!(matches!(err, GptError::BackendExhausted { attempts: 1, .. }));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_doubles_between_attempts() {
    let transport = ScriptedTransport::always(Err(TransportError::Timeout));
    let (_store, session) = memory_session("backoff", "ctx");
    let config = OpenAIConfig {
        retry: RetryPolicy {
            timeout_secs: 5,
            max_retries: 4,
            retry_delay_ms: 100,
        },
        ..openai_config(4)
    };
    let backend = Adapter::configure(OpenAIClient::new(config).unwrap(), session, transport.clone());

    let started = tokio::time::Instant::now();
    let _ = backend.converse("Hello").await;

    // 100 + 200 + 400 ms before attempts two to four.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(700), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(750), "{elapsed:?}");
    assert_eq!(transport.calls(), 4);
}

#[test]
fn test_retry_policy_delays() {
    let policy = RetryPolicy {
        timeout_secs: 0,
        max_retries: 3,
        retry_delay_ms: 250,
    };
    assert_eq!(policy.timeout(), None);
    assert_eq!(policy.delay_before(1), Duration::ZERO);
    assert_eq!(policy.delay_before(2), Duration::from_millis(250));
    assert_eq!(policy.delay_before(3), Duration::from_millis(500));
    assert_eq!(policy.attempts(), 3);
}

// ========================================================================
// Wire formats
// ========================================================================

#[tokio::test]
async fn test_openai_request_shape() {
    let transport = ScriptedTransport::always(openai_reply("ok"));
    let (_store, session) = memory_session("shape", "ctx");
    let config = OpenAIConfig {
        organization: Some("org-123".into()),
        temperature: Some(0.5),
        ..openai_config(3)
    };
    let backend =
        configure_with_transport(BackendConfig::OpenAI(config), session, transport.clone()).unwrap();

    backend.converse("Hello").await.unwrap();

    let request = transport.last_request();
    assert_eq!(request.url, "http://localhost:8080/v1/chat/completions");
    assert_eq!(request.header("authorization"), Some("Bearer test-key"));
    assert_eq!(request.header("OpenAI-Organization"), Some("org-123"));
    assert_eq!(request.timeout, Some(Duration::from_secs(5)));
    assert_eq!(request.body["model"], "gpt-3.5-turbo");
    assert_eq!(request.body["temperature"], 0.5);
    assert!(request.body.get("max_tokens").is_none());
}

#[tokio::test]
async fn test_chatsonic_turn() {
    let transport = ScriptedTransport::always(Ok(HttpResponse::ok(
        json!({"message": "sonic reply", "image_urls": []}).to_string(),
    )));
    let (store, session) = memory_session("sonic", "ctx");
    let backend = configure_with_transport(
        BackendConfig::ChatSonic(chatsonic_config(3)),
        session,
        transport.clone(),
    )
    .unwrap();

    assert_eq!(backend.kind(), BackendKind::ChatSonic);
    assert_eq!(backend.converse("Hello").await.unwrap(), "sonic reply");

    let request = transport.last_request();
    assert_eq!(request.url, "http://localhost:8080/chatsonic");
    assert_eq!(request.header("x-api-key"), Some("sonic-key"));
    assert_eq!(
        request.body,
        json!({
            "enable_memory": true,
            "enable_google_results": true,
            "input_text": "Hello",
            "history_data": [{"is_sent": true, "message": "Hello"}],
        })
    );
    assert_eq!(
        store.last_message("sonic").unwrap(),
        Some(Message::assistant("sonic reply"))
    );
}

#[test]
fn test_chatsonic_missing_message_is_protocol_error() {
    let client = ChatSonicClient::new(chatsonic_config(3)).unwrap();
    assert!(matches!(
        client.parse_reply(r#"{"detail": "nope"}"#),
        Err(GptError::BackendProtocol(_))
    ));
    assert!(matches!(
        client.parse_reply("not json"),
        Err(GptError::BackendProtocol(_))
    ));
}

#[tokio::test]
async fn test_colossal_turn() {
    let transport = ScriptedTransport::new(
        vec![Ok(HttpResponse::ok("first answer"))],
        Ok(HttpResponse::ok("second answer")),
    );
    let (store, session) = memory_session("colossal", "ctx");
    let backend = configure_with_transport(
        BackendConfig::Colossal(colossal_config(3)),
        session,
        transport.clone(),
    )
    .unwrap();

    assert_eq!(backend.converse("first").await.unwrap(), "first answer");
    assert_eq!(backend.converse("second").await.unwrap(), "second answer");

    let body = transport.last_request().body;
    assert_eq!(
        body["history"],
        json!([
            {"instruction": "first", "response": "first answer"},
            {"instruction": "second", "response": ""},
        ])
    );
    assert_eq!(body["top_k"], 40);
    assert_eq!(body["max_new_tokens"], 512);
    assert!(transport.last_request().headers.is_empty());
    assert_eq!(store.list_messages("colossal").unwrap().len(), 5);
}

#[test]
fn test_colossal_empty_body_is_protocol_error() {
    let client = ColossalClient::new(colossal_config(3));
    assert!(matches!(
        client.parse_reply("   "),
        Err(GptError::BackendProtocol(_))
    ));
    assert_eq!(client.parse_reply("raw text").unwrap(), "raw text");
}

// ========================================================================
// Configuration
// ========================================================================

#[test]
fn test_missing_api_key_is_config_error() {
    let (_store, session) = memory_session("nokey", "ctx");
    let config = OpenAIConfig {
        api_key: String::new(),
        ..openai_config(3)
    };
    let result = configure(BackendConfig::OpenAI(config), session);
    assert!(matches!(result, Err(GptError::Config(_))));
}

#[test]
fn test_backend_config_reports_kind_and_policy() {
    let config = BackendConfig::Colossal(colossal_config(7));
    assert_eq!(config.kind(), BackendKind::Colossal);
    assert_eq!(config.retry_policy().max_retries, 7);
}

#[test]
fn test_backend_kind_parsing() {
    assert_eq!("OpenAI".parse::<BackendKind>().unwrap(), BackendKind::OpenAI);
    assert_eq!("chatsonic".parse::<BackendKind>().unwrap(), BackendKind::ChatSonic);
    assert_eq!("colossal".parse::<BackendKind>().unwrap(), BackendKind::Colossal);
    assert!("llama".parse::<BackendKind>().is_err());
}
