//! Document and document indexer types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// A source document to be indexed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    pub metadata: serde_json::Value,
}

/// Result of an indexing operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexingResult {
    pub documents_indexed: usize,
    pub chunks_indexed: usize,
}

impl IndexingResult {
    /// Fold another result into this one
    pub fn merge(&mut self, other: IndexingResult) {
        self.documents_indexed += other.documents_indexed;
        self.chunks_indexed += other.chunks_indexed;
    }
}

/// Configuration for document chunking and indexing
///
/// Sizes are in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub batch_size: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 200,
            batch_size: 10,
        }
    }
}

/// Trait for document indexers
///
/// An indexer splits documents into chunks, embeds them and writes them to a
/// vector store. A chunk that cannot be embedded or stored fails the whole call.
#[async_trait]
pub trait DocumentIndexer: Send + Sync {
    /// Index a single document
    async fn index_document(&self, document: Document) -> Result<IndexingResult>;

    /// Index multiple documents
    async fn index_documents(&self, documents: Vec<Document>) -> Result<IndexingResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexing_result_merge() {
        let mut total = IndexingResult::default();
        total.merge(IndexingResult {
            documents_indexed: 1,
            chunks_indexed: 3,
        });
        total.merge(IndexingResult {
            documents_indexed: 1,
            chunks_indexed: 1,
        });

        assert_eq!(
            total,
            IndexingResult {
                documents_indexed: 2,
                chunks_indexed: 4,
            }
        );
    }
}
