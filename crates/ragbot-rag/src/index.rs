//! Vector index over a persistent store

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use ragbot_core::{
    Document, DocumentIndexer, EmbeddingProvider, IndexingConfig, LLMProvider, RAGEngine,
    RAGQuery, RAGResult, Result, SearchConfig, VectorDocument, VectorStore,
};

use crate::document_indexer::LocalDocumentIndexer;
use crate::engine::{CondenseQuestionChatEngine, EngineOptions};

/// Metadata keys shown in front of each chunk in the retrieval context
const CONTEXT_METADATA_KEYS: &[&str] = &["file_name", "file_path"];

/// A queryable view of a vector store, embedding queries with the same model
/// the store was built with.
pub struct VectorIndex {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl VectorIndex {
    /// Chunk, embed and store `documents`, then return an index over the store
    pub async fn from_documents(
        documents: Vec<Document>,
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: IndexingConfig,
    ) -> Result<Self> {
        let indexer =
            LocalDocumentIndexer::with_config(vector_store.clone(), embedder.clone(), config);
        let document_count = documents.len();
        let result = indexer.index_documents(documents).await?;

        info!(
            documents = document_count,
            chunks = result.chunks_indexed,
            "built vector index"
        );

        Ok(Self::from_vector_store(vector_store, embedder))
    }

    /// Wrap an already populated store without embedding anything
    pub fn from_vector_store(
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            vector_store,
            embedder,
        }
    }

    /// Build a condense-question chat engine answering from this index
    pub fn as_chat_engine(
        self: &Arc<Self>,
        llm: Arc<dyn LLMProvider>,
        options: EngineOptions,
    ) -> CondenseQuestionChatEngine {
        CondenseQuestionChatEngine::new(self.clone(), llm, options)
    }
}

#[async_trait]
impl RAGEngine for VectorIndex {
    async fn retrieve(&self, query: &RAGQuery) -> Result<RAGResult> {
        let vector = self.embedder.embed_query(&query.query).await?;
        let config = SearchConfig {
            top_k: query.top_k,
            score_threshold: query.score_threshold,
        };
        let search_result = self.vector_store.search_by_vector(&vector, &config).await?;
        let context = self.build_context(&search_result.documents);

        Ok(RAGResult {
            documents: search_result.documents,
            context,
            metadata: Some(json!({
                "query": query.query,
                "top_k": query.top_k,
                "results_count": search_result.total,
            })),
        })
    }

    fn build_context(&self, documents: &[VectorDocument]) -> String {
        documents
            .iter()
            .map(|doc| {
                let mut block = String::new();
                for key in CONTEXT_METADATA_KEYS {
                    if let Some(value) = doc.metadata.get(*key).and_then(|v| v.as_str()) {
                        block.push_str(&format!("{}: {}\n", key, value));
                    }
                }
                if !block.is_empty() {
                    block.push('\n');
                }
                block.push_str(&doc.content);
                block
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    async fn stats(&self) -> Result<serde_json::Value> {
        Ok(json!({
            "chunks": self.vector_store.count().await?,
            "embedding_dim": self.vector_store.embedding_dim(),
            "embed_model": self.embedder.model_id(),
        }))
    }
}
