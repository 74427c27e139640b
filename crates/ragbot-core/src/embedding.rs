//! Embedding provider trait

use async_trait::async_trait;

use crate::Result;

/// Trait for text embedding providers
///
/// Every vector returned by one provider has the same length; callers probe it
/// once and size their vector stores accordingly.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a query string at search time
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>>;

    /// Embed document texts at indexing time
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed_query(text).await?);
        }
        Ok(embeddings)
    }

    /// Get the model ID being used
    fn model_id(&self) -> &str;
}
