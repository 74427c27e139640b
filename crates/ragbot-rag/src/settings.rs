//! Pipeline settings

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use ragbot_core::config::{parse_var, string_var};
use ragbot_core::{IndexingConfig, Result};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_PERSIST_DIR: &str = "vector_store";
pub const DEFAULT_DATABASE_NAME: &str = "rag.db";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_SIMILARITY_TOP_K: usize = 2;
pub const DEFAULT_MEMORY_TOKEN_LIMIT: usize = 3000;

/// Settings for reading, indexing and querying documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Directory the source documents are read from
    pub data_dir: PathBuf,
    /// Directory holding the vector store database
    pub persist_dir: PathBuf,
    /// File name of the vector store database inside `persist_dir`
    pub database_name: String,
    /// Directory of the daily log files
    pub log_dir: PathBuf,
    pub indexing: IndexingConfig,
    pub similarity_top_k: usize,
    pub memory_token_limit: usize,
    /// Rebuild the index from `data_dir` when the chat engine is created
    pub rebuild_on_start: bool,
    /// Skip, instead of failing on, a missing store during a rebuild
    pub allow_missing_store: bool,
    /// Log the condensed query of every chat turn
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            persist_dir: PathBuf::from(DEFAULT_PERSIST_DIR),
            database_name: DEFAULT_DATABASE_NAME.to_string(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            indexing: IndexingConfig::default(),
            similarity_top_k: DEFAULT_SIMILARITY_TOP_K,
            memory_token_limit: DEFAULT_MEMORY_TOKEN_LIMIT,
            rebuild_on_start: true,
            allow_missing_store: false,
            verbose: true,
        }
    }
}

impl Settings {
    /// Create settings from environment variables (and `.env`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create settings from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            data_dir: PathBuf::from(string_var(&lookup, "RAGBOT_DATA_DIR", DEFAULT_DATA_DIR)),
            persist_dir: PathBuf::from(string_var(
                &lookup,
                "RAGBOT_PERSIST_DIR",
                DEFAULT_PERSIST_DIR,
            )),
            database_name: string_var(&lookup, "RAGBOT_DATABASE_NAME", DEFAULT_DATABASE_NAME),
            log_dir: PathBuf::from(string_var(&lookup, "RAGBOT_LOG_DIR", DEFAULT_LOG_DIR)),
            indexing: IndexingConfig {
                chunk_size: parse_var(&lookup, "RAGBOT_CHUNK_SIZE", defaults.indexing.chunk_size)?,
                chunk_overlap: parse_var(
                    &lookup,
                    "RAGBOT_CHUNK_OVERLAP",
                    defaults.indexing.chunk_overlap,
                )?,
                batch_size: defaults.indexing.batch_size,
            },
            similarity_top_k: parse_var(
                &lookup,
                "RAGBOT_SIMILARITY_TOP_K",
                defaults.similarity_top_k,
            )?,
            memory_token_limit: defaults.memory_token_limit,
            rebuild_on_start: parse_var(
                &lookup,
                "RAGBOT_REBUILD_ON_START",
                defaults.rebuild_on_start,
            )?,
            allow_missing_store: parse_var(
                &lookup,
                "RAGBOT_ALLOW_MISSING_STORE",
                defaults.allow_missing_store,
            )?,
            verbose: defaults.verbose,
        })
    }

    /// Full path of the vector store database file
    pub fn database_path(&self) -> PathBuf {
        self.persist_dir.join(&self.database_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.database_path(), PathBuf::from("vector_store").join("rag.db"));
        assert_eq!(settings.log_dir, PathBuf::from("logs"));
        assert!(settings.rebuild_on_start);
        assert!(!settings.allow_missing_store);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("RAGBOT_DATA_DIR", "docs"),
            ("RAGBOT_LOG_DIR", "/var/log/ragbot"),
            ("RAGBOT_CHUNK_SIZE", "512"),
            ("RAGBOT_REBUILD_ON_START", "false"),
            ("RAGBOT_ALLOW_MISSING_STORE", "true"),
        ]
        .into_iter()
        .collect();
        let settings = Settings::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(settings.data_dir, PathBuf::from("docs"));
        assert_eq!(settings.log_dir, PathBuf::from("/var/log/ragbot"));
        assert_eq!(settings.indexing.chunk_size, 512);
        assert_eq!(settings.indexing.chunk_overlap, 200);
        assert!(!settings.rebuild_on_start);
        assert!(settings.allow_missing_store);
    }
}
