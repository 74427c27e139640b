//! SQLite-backed persistent vector store

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use ragbot_core::{
    Error, Result, SearchConfig, SearchResult, VectorDocument, VectorStore, cosine_similarity,
};

const EMBEDDING_DIM_KEY: &str = "embedding_dim";

/// Vector store persisted in a single SQLite database file.
///
/// Embeddings are stored as little-endian `f32` blobs and searched by brute-force
/// cosine similarity.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    embedding_dim: usize,
}

impl SqliteVectorStore {
    /// Open (or create) the store at `persist_dir/database_name`.
    ///
    /// A new store records `embedding_dim`; an existing one must have been
    /// created with the same dimension.
    pub fn open(persist_dir: &Path, database_name: &str, embedding_dim: usize) -> Result<Self> {
        if embedding_dim == 0 {
            return Err(Error::InvalidInput("embedding dimension must be positive".to_string()));
        }
        fs::create_dir_all(persist_dir)?;
        let db_path = persist_dir.join(database_name);
        let conn = Connection::open(&db_path).map_err(sql_err)?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                metadata TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .map_err(sql_err)?;

        let stored: Option<String> = conn
            .query_row(
                "SELECT value FROM config WHERE key = ?1",
                params![EMBEDDING_DIM_KEY],
                |row| row.get(0),
            )
            .optional()
            .map_err(sql_err)?;

        match stored {
            Some(value) => {
                let stored_dim: usize = value.parse().map_err(|_| {
                    Error::VectorStore(format!("corrupt embedding dimension '{}'", value))
                })?;
                if stored_dim != embedding_dim {
                    return Err(Error::DimensionMismatch {
                        expected: embedding_dim,
                        actual: stored_dim,
                    });
                }
            }
            None => {
                conn.execute(
                    "INSERT INTO config (key, value) VALUES (?1, ?2)",
                    params![EMBEDDING_DIM_KEY, embedding_dim.to_string()],
                )
                .map_err(sql_err)?;
            }
        }

        debug!(path = %db_path.display(), embedding_dim, "opened vector store");

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            embedding_dim,
        })
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Delete the database file and then its directory.
    ///
    /// A missing file or directory is an error unless `allow_missing` is set.
    /// The directory must be empty once the database file is gone.
    pub fn remove_persisted(
        persist_dir: &Path,
        database_name: &str,
        allow_missing: bool,
    ) -> Result<()> {
        let db_path = persist_dir.join(database_name);

        if allow_missing && !db_path.exists() {
            info!(path = %db_path.display(), "no persisted vector store to remove");
        } else {
            fs::remove_file(&db_path).map_err(|e| removal_error(e, &db_path))?;
        }

        if allow_missing && !persist_dir.exists() {
            return Ok(());
        }
        fs::remove_dir(persist_dir).map_err(|e| removal_error(e, persist_dir))?;

        info!(path = %db_path.display(), "removed persisted vector store");
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))
    }

    fn check_dim(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.embedding_dim {
            return Err(Error::DimensionMismatch {
                expected: self.embedding_dim,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    fn insert(&self, conn: &Connection, document: &VectorDocument) -> Result<()> {
        let embedding = document.embedding.as_ref().ok_or_else(|| {
            Error::VectorStore(format!("chunk {} has no embedding", document.id))
        })?;
        self.check_dim(embedding)?;

        conn.execute(
            "INSERT OR REPLACE INTO chunks (id, content, metadata, embedding) VALUES (?1, ?2, ?3, ?4)",
            params![
                document.id,
                document.content,
                serde_json::to_string(&document.metadata)?,
                encode_embedding(embedding),
            ],
        )
        .map_err(sql_err)?;
        Ok(())
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn store(&self, document: VectorDocument) -> Result<String> {
        let conn = self.conn()?;
        self.insert(&conn, &document)?;
        Ok(document.id)
    }

    async fn store_batch(&self, documents: Vec<VectorDocument>) -> Result<Vec<String>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(sql_err)?;
        let mut ids = Vec::with_capacity(documents.len());

        for document in documents {
            self.insert(&tx, &document)?;
            ids.push(document.id);
        }

        tx.commit().map_err(sql_err)?;
        Ok(ids)
    }

    async fn search_by_vector(
        &self,
        vector: &[f32],
        config: &SearchConfig,
    ) -> Result<SearchResult> {
        self.check_dim(vector)?;
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, content, metadata, embedding FROM chunks")
            .map_err(sql_err)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                ))
            })
            .map_err(sql_err)?;

        let mut results = Vec::new();
        for row in rows {
            let (id, content, metadata, blob) = row.map_err(sql_err)?;
            let score = cosine_similarity(vector, &decode_embedding(&blob));
            if config.score_threshold.is_some_and(|threshold| score < threshold) {
                continue;
            }
            results.push(VectorDocument {
                id,
                content,
                embedding: None,
                metadata: serde_json::from_str(&metadata)?,
                score: Some(score),
            });
        }

        results.sort_by(|a, b| {
            b.score
                .unwrap_or(0.0)
                .partial_cmp(&a.score.unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(config.top_k);

        let total = results.len();
        Ok(SearchResult {
            documents: results,
            total,
        })
    }

    async fn get(&self, id: &str) -> Result<Option<VectorDocument>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT content, metadata, embedding FROM chunks WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(sql_err)?;

        row.map(|(content, metadata, blob)| -> Result<VectorDocument> {
            Ok(VectorDocument {
                id: id.to_string(),
                content,
                embedding: Some(decode_embedding(&blob)),
                metadata: serde_json::from_str(&metadata)?,
                score: None,
            })
        })
        .transpose()
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn
            .execute("DELETE FROM chunks WHERE id = ?1", params![id])
            .map_err(sql_err)?;
        Ok(removed > 0)
    }

    async fn clear(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM chunks", []).map_err(sql_err)?;
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
            .map_err(sql_err)?;
        Ok(count as usize)
    }

    fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }
}

fn sql_err(err: rusqlite::Error) -> Error {
    Error::VectorStore(err.to_string())
}

fn removal_error(err: io::Error, path: &Path) -> Error {
    Error::Io(io::Error::new(
        err.kind(),
        format!("failed to remove {}: {}", path.display(), err),
    ))
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn decode_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn chunk(id: &str, content: &str, embedding: Vec<f32>) -> VectorDocument {
        VectorDocument {
            id: id.to_string(),
            content: content.to_string(),
            embedding: Some(embedding),
            metadata: json!({"title": id}),
            score: None,
        }
    }

    #[tokio::test]
    async fn test_store_get_delete() {
        let dir = TempDir::new().unwrap();
        let store = SqliteVectorStore::open(&dir.path().join("store"), "rag.db", 3).unwrap();

        let id = store.store(chunk("doc_0", "hello", vec![1.0, 0.0, 0.0])).await.unwrap();
        assert_eq!(id, "doc_0");
        assert_eq!(store.count().await.unwrap(), 1);

        let fetched = store.get("doc_0").await.unwrap().unwrap();
        assert_eq!(fetched.content, "hello");
        assert_eq!(fetched.embedding, Some(vec![1.0, 0.0, 0.0]));
        assert_eq!(fetched.metadata["title"], "doc_0");

        assert!(store.delete("doc_0").await.unwrap());
        assert!(!store.delete("doc_0").await.unwrap());
        assert!(store.get("doc_0").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let dir = TempDir::new().unwrap();
        let store = SqliteVectorStore::open(dir.path(), "rag.db", 2).unwrap();
        store
            .store_batch(vec![
                chunk("east", "east", vec![1.0, 0.0]),
                chunk("north", "north", vec![0.0, 1.0]),
                chunk("north_east", "north east", vec![1.0, 1.0]),
            ])
            .await
            .unwrap();

        let config = SearchConfig {
            top_k: 2,
            score_threshold: None,
        };
        let results = store.search_by_vector(&[0.9, 0.1], &config).await.unwrap();
        let ids: Vec<_> = results.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["east", "north_east"]);
        assert_eq!(results.total, 2);
        assert!(results.documents[0].embedding.is_none());

        let strict = SearchConfig {
            top_k: 5,
            score_threshold: Some(0.99),
        };
        let results = store.search_by_vector(&[1.0, 0.0], &strict).await.unwrap();
        assert_eq!(results.total, 1);
    }

    #[tokio::test]
    async fn test_wrong_dimension_rejected() {
        let dir = TempDir::new().unwrap();
        let store = SqliteVectorStore::open(dir.path(), "rag.db", 3).unwrap();

        let err = store.store(chunk("bad", "bad", vec![1.0])).await.unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 1 }));

        let err = store
            .search_by_vector(&[1.0, 0.0], &SearchConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn test_reopen_persists_and_checks_dimension() {
        let dir = TempDir::new().unwrap();
        {
            let store = SqliteVectorStore::open(dir.path(), "rag.db", 2).unwrap();
            store.store(chunk("a", "alpha", vec![0.5, 0.5])).await.unwrap();
        }

        let reopened = SqliteVectorStore::open(dir.path(), "rag.db", 2).unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);

        let err = SqliteVectorStore::open(dir.path(), "rag.db", 4).err().unwrap();
        assert!(matches!(err, Error::DimensionMismatch { expected: 4, actual: 2 }));
    }

    #[tokio::test]
    async fn test_clear() {
        let dir = TempDir::new().unwrap();
        let store = SqliteVectorStore::open(dir.path(), "rag.db", 1).unwrap();
        store.store(chunk("a", "a", vec![1.0])).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[test]
    fn test_remove_persisted() {
        let dir = TempDir::new().unwrap();
        let persist_dir = dir.path().join("vector_store");
        drop(SqliteVectorStore::open(&persist_dir, "rag.db", 2).unwrap());

        SqliteVectorStore::remove_persisted(&persist_dir, "rag.db", false).unwrap();
        assert!(!persist_dir.exists());
    }

    #[test]
    fn test_remove_missing_store_fails_unless_allowed() {
        let dir = TempDir::new().unwrap();
        let persist_dir = dir.path().join("vector_store");

        let err = SqliteVectorStore::remove_persisted(&persist_dir, "rag.db", false).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("rag.db"));

        SqliteVectorStore::remove_persisted(&persist_dir, "rag.db", true).unwrap();
    }

    #[test]
    fn test_embedding_blob_roundtrip() {
        let values = vec![0.0, -1.5, 3.25, f32::MIN_POSITIVE];
        assert_eq!(decode_embedding(&encode_embedding(&values)), values);
    }
}
