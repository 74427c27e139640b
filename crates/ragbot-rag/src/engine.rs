//! Condense-question chat engine

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use ragbot_core::{
    ChatEngine, ChatMessage, ChatResponse, Error, LLMProvider, RAGEngine, RAGQuery, Result,
};

use crate::settings::Settings;

const CONDENSE_QUESTION_TEMPLATE: &str = "\
Given a conversation (between Human and Assistant) and a follow up message from Human, \
rewrite the message to be a standalone question that captures all relevant context from the conversation.

<Chat History>
{chat_history}

<Follow Up Message>
{question}

<Standalone question>
";

const TEXT_QA_TEMPLATE: &str = "\
Context information is below.
---------------------
{context}
---------------------
Given the context information and not prior knowledge, answer the query.
Query: {question}
Answer: ";

/// Tuning for a [`CondenseQuestionChatEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Number of chunks retrieved per question
    pub similarity_top_k: usize,
    /// Token budget of the history passed to the condense step
    pub memory_token_limit: usize,
    /// Log every condensed question
    pub verbose: bool,
}

impl From<&Settings> for EngineOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            similarity_top_k: settings.similarity_top_k,
            memory_token_limit: settings.memory_token_limit,
            verbose: settings.verbose,
        }
    }
}

/// Chat engine that rewrites each follow-up into a standalone question, retrieves
/// context for it, and answers from that context.
pub struct CondenseQuestionChatEngine {
    retriever: Arc<dyn RAGEngine>,
    llm: Arc<dyn LLMProvider>,
    memory: Mutex<Vec<ChatMessage>>,
    options: EngineOptions,
}

impl CondenseQuestionChatEngine {
    pub fn new(
        retriever: Arc<dyn RAGEngine>,
        llm: Arc<dyn LLMProvider>,
        options: EngineOptions,
    ) -> Self {
        Self {
            retriever,
            llm,
            memory: Mutex::new(Vec::new()),
            options,
        }
    }

    async fn condense_question(&self, history: &[ChatMessage], message: &str) -> Result<String> {
        if history.is_empty() {
            return Ok(message.to_string());
        }

        let result = self.llm.complete(&condense_prompt(history, message)).await?;
        let condensed = result.text.trim();
        if condensed.is_empty() {
            debug!("condense step returned nothing, using the message as is");
            return Ok(message.to_string());
        }
        Ok(condensed.to_string())
    }
}

#[async_trait]
impl ChatEngine for CondenseQuestionChatEngine {
    async fn chat(&self, message: &str) -> Result<ChatResponse> {
        if message.trim().is_empty() {
            return Err(Error::InvalidInput("message is empty".to_string()));
        }

        // Held for the whole turn so requests on one engine run one at a time.
        let mut memory = self.memory.lock().await;

        let history = trim_history(&memory, self.options.memory_token_limit);
        let question = self.condense_question(history, message).await?;
        if self.options.verbose {
            info!("Querying with: {}", question);
        }

        let retrieved = self
            .retriever
            .retrieve(&RAGQuery::new(question.as_str(), self.options.similarity_top_k))
            .await?;
        debug!(chunks = retrieved.documents.len(), "retrieved context");

        let answer = self
            .llm
            .complete(&qa_prompt(&retrieved.context, &question))
            .await?;

        memory.push(ChatMessage::user(message));
        memory.push(ChatMessage::assistant(answer.text.clone()));

        Ok(ChatResponse {
            response: answer.text,
            source_documents: retrieved.documents,
        })
    }

    async fn reset(&self) {
        self.memory.lock().await.clear();
    }

    async fn chat_history(&self) -> Vec<ChatMessage> {
        self.memory.lock().await.clone()
    }
}

/// Prompt asking the model to rewrite `message` as a standalone question
pub fn condense_prompt(history: &[ChatMessage], message: &str) -> String {
    let chat_history = history
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n");

    CONDENSE_QUESTION_TEMPLATE
        .replace("{chat_history}", &chat_history)
        .replace("{question}", message)
}

/// Prompt asking the model to answer `question` from `context`
pub fn qa_prompt(context: &str, question: &str) -> String {
    TEXT_QA_TEMPLATE
        .replace("{context}", context)
        .replace("{question}", question)
}

/// Newest suffix of `history` whose estimated token count fits `token_limit`
pub fn trim_history(history: &[ChatMessage], token_limit: usize) -> &[ChatMessage] {
    let mut used = 0;
    let mut start = history.len();
    for (i, message) in history.iter().enumerate().rev() {
        used += estimate_tokens(&message.content);
        if used > token_limit {
            break;
        }
        start = i;
    }
    &history[start..]
}

/// Rough token count, four characters per token
fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condense_prompt() {
        let history = vec![
            ChatMessage::user("What does the VSS extension do?"),
            ChatMessage::assistant("It adds vector similarity search to DuckDB."),
        ];
        let prompt = condense_prompt(&history, "Which index does it use?");

        insta::assert_snapshot!(prompt.trim_end(), @r"
        Given a conversation (between Human and Assistant) and a follow up message from Human, rewrite the message to be a standalone question that captures all relevant context from the conversation.

        <Chat History>
        user: What does the VSS extension do?
        assistant: It adds vector similarity search to DuckDB.

        <Follow Up Message>
        Which index does it use?

        <Standalone question>
        ");
    }

    #[test]
    fn test_qa_prompt() {
        let prompt = qa_prompt("file_name: vss.md\n\nHNSW indexes", "Which index?");
        assert_eq!(
            prompt,
            "Context information is below.\n\
             ---------------------\n\
             file_name: vss.md\n\nHNSW indexes\n\
             ---------------------\n\
             Given the context information and not prior knowledge, answer the query.\n\
             Query: Which index?\n\
             Answer: "
        );
    }

    #[test]
    fn test_trim_history_keeps_newest_messages() {
        let history = vec![
            ChatMessage::user("a".repeat(40)),
            ChatMessage::assistant("b".repeat(40)),
            ChatMessage::user("c".repeat(8)),
        ];
        // 10 + 10 + 2 tokens
        assert_eq!(trim_history(&history, 100).len(), 3);
        assert_eq!(trim_history(&history, 12), &history[1..]);
        assert_eq!(trim_history(&history, 5), &history[2..]);
        assert!(trim_history(&history, 1).is_empty());
        assert!(trim_history(&[], 10).is_empty());
    }
}
