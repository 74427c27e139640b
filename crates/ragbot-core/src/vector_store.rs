//! Vector store trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// A chunk stored in the vector store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDocument {
    pub id: String,
    pub content: String,
    pub embedding: Option<Vec<f32>>,
    pub metadata: serde_json::Value,
    pub score: Option<f32>,
}

/// Search result from vector store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub documents: Vec<VectorDocument>,
    pub total: usize,
}

/// Configuration for vector search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub top_k: usize,
    pub score_threshold: Option<f32>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: 2,
            score_threshold: None,
        }
    }
}

/// Trait for persistent vector stores
///
/// A store is created for one embedding dimension and rejects vectors of any
/// other length.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store a chunk, replacing any chunk with the same ID
    async fn store(&self, document: VectorDocument) -> Result<String>;

    /// Store multiple chunks in one transaction
    async fn store_batch(&self, documents: Vec<VectorDocument>) -> Result<Vec<String>>;

    /// Search using a query embedding, highest cosine similarity first
    async fn search_by_vector(&self, vector: &[f32], config: &SearchConfig) -> Result<SearchResult>;

    /// Get a chunk by ID
    async fn get(&self, id: &str) -> Result<Option<VectorDocument>>;

    /// Delete a chunk by ID
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Clear all chunks from the store
    async fn clear(&self) -> Result<()>;

    /// Get the total number of chunks
    async fn count(&self) -> Result<usize>;

    /// Embedding dimension the store was created with
    fn embedding_dim(&self) -> usize;
}

/// Cosine similarity between two vectors; 0.0 when lengths differ or either is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
