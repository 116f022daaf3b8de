//! Configuration for synchronization and retrieval.
//!
//! All behavior is driven by an explicit [`SyncConfig`] handed to the
//! reconciler at construction. There is no ambient state: two reconcilers
//! with two configs can sync two directory/index pairs independently in
//! one process, and tests construct throwaway configs freely.

use crate::error::SyncError;
use docdex_context::WindowConfig;
use docdex_embed::EmbedConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Knobs for diversity-aware retrieval.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Number of chunks to return
    pub k: usize,
    /// Relevance/diversity balance: 1.0 = pure relevance, 0.0 = pure diversity
    pub lambda: f32,
    /// Candidate pool size fetched before diversity selection
    pub fetch_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: 4,
            lambda: 0.5,
            fetch_k: 20,
        }
    }
}

/// Configuration for one directory/index pair.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Directory scanned for source documents
    pub root: PathBuf,
    /// Directory holding the persisted index (created if absent)
    pub index_dir: PathBuf,
    /// The single recognized source file extension (without the dot)
    pub source_extension: String,
    /// Maximum chunk window length in characters
    pub window_len: usize,
    /// Overlap between consecutive windows in characters
    pub overlap_len: usize,
    /// Maximum concurrent source ingests
    pub max_workers: usize,
    /// Deadline for loading, splitting, and embedding one source
    pub source_timeout: Duration,
    /// Embedding model configuration
    pub embedding: EmbedConfig,
    /// Retrieval defaults
    pub retrieval: RetrievalConfig,
}

impl SyncConfig {
    /// Create a configuration with default settings for the given
    /// source root and index directory.
    pub fn new(root: PathBuf, index_dir: PathBuf) -> Self {
        Self {
            root,
            index_dir,
            source_extension: "pdf".to_string(),
            window_len: 1000,
            overlap_len: 200,
            max_workers: 4,
            source_timeout: Duration::from_secs(60),
            embedding: EmbedConfig::new("all-minilm-l6-v2"),
            retrieval: RetrievalConfig::default(),
        }
    }

    /// Set the recognized source file extension.
    pub fn with_source_extension<S: Into<String>>(mut self, extension: S) -> Self {
        self.source_extension = extension.into();
        self
    }

    /// Set the chunk window length and overlap, in characters.
    pub fn with_window(mut self, window_len: usize, overlap_len: usize) -> Self {
        self.window_len = window_len;
        self.overlap_len = overlap_len;
        self
    }

    /// Set the maximum number of concurrent source ingests.
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers;
        self
    }

    /// Set the per-source ingest deadline.
    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    /// Set the embedding configuration.
    pub fn with_embedding(mut self, embedding: EmbedConfig) -> Self {
        self.embedding = embedding;
        self
    }

    /// Set the retrieval defaults.
    pub fn with_retrieval(mut self, retrieval: RetrievalConfig) -> Self {
        self.retrieval = retrieval;
        self
    }

    /// Validate the window parameters and return the splitter config.
    pub fn window_config(&self) -> Result<WindowConfig, SyncError> {
        Ok(WindowConfig::new(self.window_len, self.overlap_len)?)
    }
}

/// TOML file representation (`docdex.toml`); every section and field is
/// optional and falls back to the same defaults as [`SyncConfig::new`].
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub sync: SyncSection,
    #[serde(default)]
    pub embedding: EmbeddingSection,
    #[serde(default)]
    pub retrieval: RetrievalSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncSection {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default = "default_window_len")]
    pub window_len: usize,
    #[serde(default = "default_overlap_len")]
    pub overlap_len: usize,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_source_timeout_secs")]
    pub source_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSection {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalSection {
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_lambda")]
    pub lambda: f32,
    #[serde(default = "default_fetch_k")]
    pub fetch_k: usize,
}

fn default_root() -> PathBuf {
    PathBuf::from("data")
}

fn default_index_dir() -> PathBuf {
    PathBuf::from(".docdex")
}

fn default_extension() -> String {
    "pdf".to_string()
}

fn default_window_len() -> usize {
    1000
}

fn default_overlap_len() -> usize {
    200
}

fn default_max_workers() -> usize {
    4
}

fn default_source_timeout_secs() -> u64 {
    60
}

fn default_model() -> String {
    "all-minilm-l6-v2".to_string()
}

fn default_batch_size() -> usize {
    32
}

fn default_k() -> usize {
    4
}

fn default_lambda() -> f32 {
    0.5
}

fn default_fetch_k() -> usize {
    20
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            index_dir: default_index_dir(),
            extension: default_extension(),
            window_len: default_window_len(),
            overlap_len: default_overlap_len(),
            max_workers: default_max_workers(),
            source_timeout_secs: default_source_timeout_secs(),
        }
    }
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            model: default_model(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            k: default_k(),
            lambda: default_lambda(),
            fetch_k: default_fetch_k(),
        }
    }
}

impl FileConfig {
    /// Parse a TOML config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Convert the file representation into a [`SyncConfig`].
    pub fn into_sync_config(self) -> SyncConfig {
        SyncConfig::new(self.sync.root, self.sync.index_dir)
            .with_source_extension(self.sync.extension)
            .with_window(self.sync.window_len, self.sync.overlap_len)
            .with_max_workers(self.sync.max_workers)
            .with_source_timeout(Duration::from_secs(self.sync.source_timeout_secs))
            .with_embedding(
                EmbedConfig::new(self.embedding.model).with_batch_size(self.embedding.batch_size),
            )
            .with_retrieval(RetrievalConfig {
                k: self.retrieval.k,
                lambda: self.retrieval.lambda,
                fetch_k: self.retrieval.fetch_k,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_methods() {
        let config = SyncConfig::new(PathBuf::from("/docs"), PathBuf::from("/idx"))
            .with_source_extension("txt")
            .with_window(500, 100)
            .with_max_workers(2)
            .with_source_timeout(Duration::from_secs(5));

        assert_eq!(config.source_extension, "txt");
        assert_eq!(config.window_len, 500);
        assert_eq!(config.overlap_len, 100);
        assert_eq!(config.max_workers, 2);
        assert!(config.window_config().is_ok());
    }

    #[test]
    fn test_degenerate_window_rejected() {
        let config =
            SyncConfig::new(PathBuf::from("/docs"), PathBuf::from("/idx")).with_window(100, 100);
        assert!(config.window_config().is_err());
    }

    #[test]
    fn test_file_config_defaults() {
        let file: FileConfig = toml::from_str("").unwrap();
        let config = file.into_sync_config();

        assert_eq!(config.source_extension, "pdf");
        assert_eq!(config.window_len, 1000);
        assert_eq!(config.retrieval.k, 4);
    }

    #[test]
    fn test_file_config_overrides() {
        let file: FileConfig = toml::from_str(
            r#"
            [sync]
            root = "corpus"
            extension = "txt"
            window_len = 400
            overlap_len = 50

            [embedding]
            model = "bge-small-en-v1.5"

            [retrieval]
            k = 8
            "#,
        )
        .unwrap();
        let config = file.into_sync_config();

        assert_eq!(config.root, PathBuf::from("corpus"));
        assert_eq!(config.source_extension, "txt");
        assert_eq!(config.window_len, 400);
        assert_eq!(config.embedding.model_name, "bge-small-en-v1.5");
        assert_eq!(config.retrieval.k, 8);
    }
}
