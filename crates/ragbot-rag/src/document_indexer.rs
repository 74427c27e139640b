//! Chunking document indexer

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use ragbot_core::{
    Document, DocumentIndexer, EmbeddingProvider, Error, IndexingConfig, IndexingResult, Result,
    VectorDocument, VectorStore,
};

/// Splits documents into overlapping chunks, embeds them and writes them to a vector store
pub struct LocalDocumentIndexer {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: IndexingConfig,
}

impl LocalDocumentIndexer {
    /// Create an indexer writing to `vector_store`
    pub fn with_config(
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: IndexingConfig,
    ) -> Self {
        Self {
            vector_store,
            embedder,
            config,
        }
    }

    /// Chunk a document into smaller pieces
    pub fn chunk_document(&self, content: &str) -> Vec<String> {
        split_text(content, self.config.chunk_size, self.config.chunk_overlap)
    }
}

/// Split `text` into chunks of at most `chunk_size` characters where consecutive
/// chunks share up to `chunk_overlap` characters. Breaks fall on whitespace when
/// one exists in the second half of the window.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chunk_size == 0 || chars.len() <= chunk_size {
        let trimmed = text.trim();
        return if trimmed.is_empty() { vec![] } else { vec![trimmed.to_string()] };
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let mut end = (start + chunk_size).min(chars.len());
        if end < chars.len() {
            let floor = start + chunk_size / 2;
            if let Some(pos) = (floor..end).rev().find(|&i| chars[i].is_whitespace()) {
                end = pos;
            }
        }

        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        if end >= chars.len() {
            break;
        }

        let mut next = end.saturating_sub(chunk_overlap);
        if next <= start {
            next = end;
        }
        // Start the overlap on a word boundary.
        while next < end && next > 0 && !chars[next - 1].is_whitespace() {
            next += 1;
        }
        start = next;
    }

    chunks
}

#[async_trait]
impl DocumentIndexer for LocalDocumentIndexer {
    async fn index_document(&self, document: Document) -> Result<IndexingResult> {
        let chunks = self.chunk_document(&document.content);
        let total_chunks = chunks.len();
        let mut result = IndexingResult::default();

        let vector_docs: Vec<VectorDocument> = chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                let mut metadata = document.metadata.clone();
                metadata["chunk_index"] = json!(i);
                metadata["total_chunks"] = json!(total_chunks);
                metadata["title"] = json!(document.title);
                metadata["document_id"] = json!(document.id);

                VectorDocument {
                    id: format!("{}_{}", document.id, i),
                    content: chunk,
                    embedding: None,
                    metadata,
                    score: None,
                }
            })
            .collect();

        for batch in vector_docs.chunks(self.config.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|d| d.content.clone()).collect();
            let embeddings = self.embedder.embed_documents(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(Error::Embedding(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            let embedded: Vec<VectorDocument> = batch
                .iter()
                .cloned()
                .zip(embeddings)
                .map(|(mut doc, embedding)| {
                    doc.embedding = Some(embedding);
                    doc
                })
                .collect();

            let ids = self.vector_store.store_batch(embedded).await?;
            result.chunks_indexed += ids.len();
        }

        if result.chunks_indexed > 0 {
            result.documents_indexed = 1;
        }
        debug!(document = %document.title, chunks = result.chunks_indexed, "indexed document");
        Ok(result)
    }

    async fn index_documents(&self, documents: Vec<Document>) -> Result<IndexingResult> {
        let mut total = IndexingResult::default();
        for document in documents {
            total.merge(self.index_document(document).await?);
        }
        Ok(total)
    }
}
