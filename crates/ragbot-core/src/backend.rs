//! Model backend factory

use std::sync::Arc;

use crate::{EmbeddingProvider, LLMProvider, Result};

/// Factory for the generative and embedding model handles.
///
/// Constructing a handle must not contact the backend; reachability is
/// discovered by the first request made through it.
pub trait ModelBackend: Send + Sync {
    /// Create the generative model handle
    fn llm(&self) -> Result<Arc<dyn LLMProvider>>;

    /// Create the embedding model handle
    fn embedder(&self) -> Result<Arc<dyn EmbeddingProvider>>;
}
