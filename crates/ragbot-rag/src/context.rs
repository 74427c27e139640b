//! Application context holding the lazily created models, indexes and chat engine

use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use ragbot_core::{EmbeddingProvider, Error, LLMProvider, ModelBackend, Result, VectorStore};

use crate::engine::{CondenseQuestionChatEngine, EngineOptions};
use crate::index::VectorIndex;
use crate::reader::DirectoryReader;
use crate::settings::Settings;
use crate::vector_store::SqliteVectorStore;

/// Input used to discover the embedding dimension
const EMBED_PROBE: &str = "hello";

/// Model handles shared by every component of one context
pub struct Models {
    pub llm: Arc<dyn LLMProvider>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// Length of every vector produced by `embedder`
    pub embed_dim: usize,
}

/// Owns the heavy resources of a ragbot process.
///
/// Every initializer runs at most once successfully per context; a failed
/// initialization leaves nothing cached so the next call tries again.
pub struct AppContext {
    settings: Settings,
    backend: Arc<dyn ModelBackend>,
    models: OnceCell<Arc<Models>>,
    rebuilt_index: OnceCell<Arc<VectorIndex>>,
    loaded_index: OnceCell<Arc<VectorIndex>>,
    chat_engine: OnceCell<Arc<CondenseQuestionChatEngine>>,
}

impl AppContext {
    pub fn new(settings: Settings, backend: Arc<dyn ModelBackend>) -> Self {
        Self {
            settings,
            backend,
            models: OnceCell::new(),
            rebuilt_index: OnceCell::new(),
            loaded_index: OnceCell::new(),
            chat_engine: OnceCell::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Create the model handles and probe the embedding dimension
    pub async fn init_models(&self) -> Result<Arc<Models>> {
        self.models
            .get_or_try_init(|| async {
                let llm = self.backend.llm()?;
                let embedder = self.backend.embedder()?;

                let probe = embedder.embed_query(EMBED_PROBE).await?;
                if probe.is_empty() {
                    return Err(Error::Embedding(format!(
                        "model {} returned an empty embedding",
                        embedder.model_id()
                    )));
                }

                info!(
                    llm = llm.model_id(),
                    embedder = embedder.model_id(),
                    embed_dim = probe.len(),
                    "models initialized"
                );
                Ok(Arc::new(Models {
                    llm,
                    embedder,
                    embed_dim: probe.len(),
                }))
            })
            .await
            .cloned()
    }

    /// Build the index from the source documents, or open the persisted one
    pub async fn init_index(&self, rebuild: bool) -> Result<Arc<VectorIndex>> {
        let cell = if rebuild {
            &self.rebuilt_index
        } else {
            &self.loaded_index
        };

        cell.get_or_try_init(|| async {
            let models = self.init_models().await?;
            let index = if rebuild {
                self.rebuild_index(&models).await?
            } else {
                self.load_index(&models).await?
            };
            Ok(Arc::new(index))
        })
        .await
        .cloned()
    }

    /// Create the chat engine over the index selected by `rebuild_on_start`
    pub async fn init_engine(&self) -> Result<Arc<CondenseQuestionChatEngine>> {
        self.chat_engine
            .get_or_try_init(|| async {
                let models = self.init_models().await?;
                let index = self.init_index(self.settings.rebuild_on_start).await?;
                let engine =
                    index.as_chat_engine(models.llm.clone(), EngineOptions::from(&self.settings));
                info!("chat engine ready");
                Ok(Arc::new(engine))
            })
            .await
            .cloned()
    }

    async fn rebuild_index(&self, models: &Models) -> Result<VectorIndex> {
        let settings = &self.settings;
        let documents = DirectoryReader::new(&settings.data_dir).load_data()?;
        info!(
            documents = documents.len(),
            dir = %settings.data_dir.display(),
            "rebuilding index"
        );

        SqliteVectorStore::remove_persisted(
            &settings.persist_dir,
            &settings.database_name,
            settings.allow_missing_store,
        )?;
        let store = SqliteVectorStore::open(
            &settings.persist_dir,
            &settings.database_name,
            models.embed_dim,
        )?;

        VectorIndex::from_documents(
            documents,
            Arc::new(store),
            models.embedder.clone(),
            settings.indexing.clone(),
        )
        .await
    }

    async fn load_index(&self, models: &Models) -> Result<VectorIndex> {
        let settings = &self.settings;
        let store = SqliteVectorStore::open(
            &settings.persist_dir,
            &settings.database_name,
            models.embed_dim,
        )?;

        let chunks = store.count().await?;
        if chunks == 0 {
            warn!(path = %store.path().display(), "loaded vector store is empty");
        } else {
            info!(chunks, path = %store.path().display(), "loaded vector store");
        }

        Ok(VectorIndex::from_vector_store(Arc::new(store), models.embedder.clone()))
    }
}
