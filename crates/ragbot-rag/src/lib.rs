//! Retrieval pipeline for ragbot
//!
//! Reads source documents from disk, chunks and embeds them into a SQLite-backed
//! vector store, and answers questions through a condense-question chat engine.
//! [`AppContext`] owns the lazily created models, indexes and engine of a process.

pub mod context;
pub mod document_indexer;
pub mod engine;
pub mod index;
pub mod reader;
pub mod settings;
pub mod vector_store;


pub use context::{AppContext, Models};
pub use document_indexer::{LocalDocumentIndexer, split_text};
pub use engine::{CondenseQuestionChatEngine, EngineOptions, condense_prompt, qa_prompt};
pub use index::VectorIndex;
pub use reader::DirectoryReader;
pub use settings::Settings;
pub use vector_store::SqliteVectorStore;
