//! Core traits and types for ragbot
//!
//! This crate defines the capability-facing interfaces shared by the ragbot crates:
//! generative and embedding model providers, the model backend factory, vector stores,
//! document indexers, retrievers and chat engines.

pub mod backend;
pub mod chat;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod rag;
pub mod vector_store;

pub use backend::ModelBackend;
pub use chat::{ChatEngine, ChatMessage, ChatResponse, Role};
pub use document::{Document, DocumentIndexer, IndexingConfig, IndexingResult};
pub use embedding::EmbeddingProvider;
pub use error::{Error, Result};
pub use llm::{GenerationResult, LLMProvider};
pub use rag::{RAGEngine, RAGQuery, RAGResult};
pub use vector_store::{SearchConfig, SearchResult, VectorDocument, VectorStore, cosine_similarity};
