use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use ragbot_core::{ChatEngine, ChatMessage, ChatResponse, Error, Result, Role};

use crate::{ChatSession, GREETING, SessionState};

#[derive(Default)]
struct EchoEngine {
    failing: AtomicBool,
    calls: AtomicUsize,
}

#[async_trait]
impl ChatEngine for EchoEngine {
    async fn chat(&self, message: &str) -> Result<ChatResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Network("Ollama backend unreachable".to_string()));
        }
        Ok(ChatResponse {
            response: format!("echo: {}", message),
            source_documents: vec![],
        })
    }

    async fn reset(&self) {}

    async fn chat_history(&self) -> Vec<ChatMessage> {
        Vec::new()
    }
}

fn session_with(engine: Arc<EchoEngine>) -> ChatSession {
    let mut session = ChatSession::new();
    session.ensure_initialized();
    session.set_engine(engine);
    session
}

#[test]
fn test_greeting_seeded_once() {
    let mut session = ChatSession::new();
    assert_eq!(session.state(), SessionState::Empty);
    assert!(session.messages().is_empty());

    session.ensure_initialized();
    session.ensure_initialized();
    assert_eq!(session.messages(), &[ChatMessage::assistant(GREETING)]);
    assert_eq!(session.state(), SessionState::AwaitingInput);
}

#[tokio::test]
async fn test_two_turns_alternate_roles() {
    let mut session = session_with(Arc::new(EchoEngine::default()));

    for prompt in ["What is VSS?", "Which index does it use?"] {
        assert!(session.submit(prompt).unwrap());
        assert!(session.needs_response());
        session.respond().await.unwrap();
        assert!(!session.needs_response());
    }

    let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::Assistant, Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
    assert_eq!(session.messages()[4].content, "echo: Which index does it use?");
}

#[tokio::test]
async fn test_failed_response_keeps_user_turn() {
    let engine = Arc::new(EchoEngine::default());
    engine.failing.store(true, Ordering::SeqCst);
    let mut session = session_with(engine.clone());

    session.submit("hello?").unwrap();
    let err = session.respond().await.unwrap_err();
    assert!(err.is_connectivity());
    assert_eq!(session.state(), SessionState::AwaitingInput);
    assert_eq!(session.messages().len(), 2);
    assert_eq!(session.messages()[1], ChatMessage::user("hello?"));

    // nothing retried until the user resubmits
    assert!(!session.needs_response());
    assert_eq!(engine.calls.load(Ordering::SeqCst), 1);

    engine.failing.store(false, Ordering::SeqCst);
    session.submit("hello?").unwrap();
    session.respond().await.unwrap();
    let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::Assistant, Role::User, Role::User, Role::Assistant]);
}

#[tokio::test]
async fn test_blank_and_pending_submissions() {
    let mut session = session_with(Arc::new(EchoEngine::default()));

    assert!(!session.submit("   \t").unwrap());
    assert_eq!(session.messages().len(), 1);
    assert_eq!(session.state(), SessionState::AwaitingInput);

    session.submit("first").unwrap();
    let err = session.submit("second").unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(session.messages().len(), 2);

    let err = {
        session.respond().await.unwrap();
        session.respond().await.unwrap_err()
    };
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_engine_created_once() {
    let mut session = ChatSession::new();
    let inits = AtomicUsize::new(0);

    let failed = session
        .ensure_engine(|| async { Err(Error::Network("unreachable".to_string())) })
        .await;
    assert!(failed.is_err());

    for _ in 0..2 {
        session
            .ensure_engine(|| async {
                inits.fetch_add(1, Ordering::SeqCst);
                let engine: Arc<dyn ChatEngine> = Arc::new(EchoEngine::default());
                Ok(engine)
            })
            .await
            .unwrap();
    }
    assert_eq!(inits.load(Ordering::SeqCst), 1);

    session.submit("hi").unwrap();
    session.respond().await.unwrap();
    assert_eq!(session.messages().last().unwrap().content, "echo: hi");
}

#[tokio::test]
async fn test_failed_engine_init_ends_pending_turn() {
    let mut session = ChatSession::new();
    session.submit("anyone there?").unwrap();
    assert_eq!(session.messages().len(), 2);

    let err = session
        .ensure_engine(|| async { Err(Error::Timeout("request timed out".to_string())) })
        .await
        .err()
        .unwrap();
    assert!(err.is_connectivity());
    assert!(!session.needs_response());
    assert_eq!(session.messages()[1], ChatMessage::user("anyone there?"));
}

#[tokio::test]
async fn test_start_creates_engine_before_first_prompt() {
    let mut session = ChatSession::new();
    let inits = AtomicUsize::new(0);
    let init = || async {
        inits.fetch_add(1, Ordering::SeqCst);
        let engine: Arc<dyn ChatEngine> = Arc::new(EchoEngine::default());
        Ok(engine)
    };

    session.start(init).await.unwrap();
    assert_eq!(inits.load(Ordering::SeqCst), 1);
    assert_eq!(session.messages(), &[ChatMessage::assistant(GREETING)]);

    session.submit("hi").unwrap();
    session
        .ensure_engine(|| async { Err(Error::ChatEngine("created twice".to_string())) })
        .await
        .unwrap();
    session.respond().await.unwrap();
    assert_eq!(session.messages().last().unwrap().content, "echo: hi");
}

#[tokio::test]
async fn test_failed_start_retries_on_first_prompt() {
    let mut session = ChatSession::new();
    let err = session
        .start(|| async { Err(Error::Network("Ollama backend unreachable".to_string())) })
        .await
        .unwrap_err();
    assert!(err.is_connectivity());
    assert_eq!(session.state(), SessionState::AwaitingInput);
    assert_eq!(session.messages().len(), 1);

    session.submit("hello").unwrap();
    session
        .ensure_engine(|| async {
            let engine: Arc<dyn ChatEngine> = Arc::new(EchoEngine::default());
            Ok(engine)
        })
        .await
        .unwrap();
    session.respond().await.unwrap();
    assert_eq!(session.messages().len(), 3);
}
