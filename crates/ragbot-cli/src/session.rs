//! Per-session chat state

use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use ragbot_core::{ChatEngine, ChatMessage, Error, Result};

/// First assistant message of every session
pub const GREETING: &str = "I am rag bot!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing shown yet
    Empty,
    /// Waiting for the user to submit a prompt
    AwaitingInput,
    /// The last user message has not been answered yet
    PendingResponse,
}

/// Conversation shown to one user, plus the engine answering it.
///
/// A failed [`ChatSession::respond`] keeps the unanswered user message in the
/// history and returns to [`SessionState::AwaitingInput`]; the user resubmits.
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    state: SessionState,
    engine: Option<Arc<dyn ChatEngine>>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            state: SessionState::Empty,
            engine: None,
        }
    }

    /// Seed the greeting the first time the session is shown
    pub fn ensure_initialized(&mut self) {
        if self.state == SessionState::Empty {
            self.messages.push(ChatMessage::assistant(GREETING));
            self.state = SessionState::AwaitingInput;
        }
    }

    /// Return the session's engine, creating it with `init` on first use.
    ///
    /// A failed `init` leaves the session without an engine so the next call
    /// tries again. While a response is pending, the failure ends that turn the
    /// same way a failed [`ChatSession::respond`] does.
    pub async fn ensure_engine<F, Fut>(&mut self, init: F) -> Result<Arc<dyn ChatEngine>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn ChatEngine>>>,
    {
        if let Some(engine) = &self.engine {
            return Ok(engine.clone());
        }
        let engine = match init().await {
            Ok(engine) => engine,
            Err(e) => {
                if self.state == SessionState::PendingResponse {
                    self.state = SessionState::AwaitingInput;
                }
                return Err(e);
            }
        };
        self.engine = Some(engine.clone());
        Ok(engine)
    }

    /// Seed the greeting and create the engine before the first prompt is read.
    ///
    /// On failure the session keeps its greeting and stays ready for input; the
    /// engine is created again when the first prompt needs a response.
    pub async fn start<F, Fut>(&mut self, init: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn ChatEngine>>>,
    {
        self.ensure_initialized();
        self.ensure_engine(init).await.map(|_| ())
    }

    pub fn set_engine(&mut self, engine: Arc<dyn ChatEngine>) {
        self.engine = Some(engine);
    }

    /// Append a user prompt. Returns `false` when the prompt is blank and was ignored.
    pub fn submit(&mut self, prompt: &str) -> Result<bool> {
        if self.state == SessionState::PendingResponse {
            return Err(Error::InvalidInput(
                "a response is still pending".to_string(),
            ));
        }
        if prompt.trim().is_empty() {
            return Ok(false);
        }

        self.ensure_initialized();
        self.messages.push(ChatMessage::user(prompt));
        self.state = SessionState::PendingResponse;
        Ok(true)
    }

    pub fn needs_response(&self) -> bool {
        self.state == SessionState::PendingResponse
    }

    /// Ask the engine to answer the pending user message
    pub async fn respond(&mut self) -> Result<()> {
        if !self.needs_response() {
            return Err(Error::InvalidInput("no message awaiting a response".to_string()));
        }
        let prompt = match self.messages.last() {
            Some(message) => message.content.clone(),
            None => {
                self.state = SessionState::AwaitingInput;
                return Err(Error::ChatEngine("pending message is missing".to_string()));
            }
        };
        let Some(engine) = self.engine.clone() else {
            self.state = SessionState::AwaitingInput;
            return Err(Error::ChatEngine("chat engine is not initialized".to_string()));
        };

        let result = engine.chat(&prompt).await;
        self.state = SessionState::AwaitingInput;

        let response = result?;
        debug!(sources = response.source_documents.len(), "received response");
        self.messages.push(ChatMessage::assistant(response.response));
        Ok(())
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn state(&self) -> SessionState {
        self.state
    }
}
