//! The ingest pipeline: one source file to persisted index entries.
//!
//! Ingest is all-or-nothing per source. Every entry (text window,
//! metadata, embedding) is fully built before the first index
//! write, and a write failure partway through triggers a compensating
//! delete of the entries already written. A source is therefore either
//! fully represented in the index or fully absent, never partial.
//!
//! Entry ids are fresh UUIDs minted per ingest run. Re-ingesting the
//! same source produces new, disjoint ids; nothing may rely on id
//! stability across runs.

use crate::error::SyncError;
use crate::index::{EntryId, EntryMetadata, IndexEntry, VectorIndex};
use crate::loader::DocumentLoader;
use docdex_context::{WindowConfig, WindowSplitter};
use docdex_embed::EmbeddingProvider;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Turns one source file into persisted index entries.
#[derive(Clone)]
pub struct IngestPipeline {
    splitter: WindowSplitter,
    loader: Arc<dyn DocumentLoader>,
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
}

impl IngestPipeline {
    pub fn new(
        window: WindowConfig,
        loader: Arc<dyn DocumentLoader>,
        provider: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            splitter: WindowSplitter::new(window),
            loader,
            provider,
            index,
        }
    }

    /// Ingest one source, returning the number of entries written.
    ///
    /// The `deadline` bounds the load/split/embed phase so a hanging
    /// loader or embedding backend surfaces as a per-source
    /// [`SyncError::Timeout`] instead of stalling the pass. Writes run
    /// after the deadline check and are rolled back on failure.
    pub async fn ingest_source(
        &self,
        source_id: &str,
        deadline: Duration,
    ) -> Result<usize, SyncError> {
        let entries = tokio::time::timeout(deadline, self.build_entries(source_id))
            .await
            .map_err(|_| SyncError::Timeout {
                source_id: source_id.to_string(),
                seconds: deadline.as_secs(),
            })??;

        if entries.is_empty() {
            debug!("{source_id}: no extractable text, nothing to write");
            return Ok(0);
        }

        let mut written: Vec<EntryId> = Vec::with_capacity(entries.len());
        for entry in &entries {
            if let Err(e) = self.index.add(entry).await {
                warn!(
                    "{source_id}: write failed after {} of {} entries, rolling back",
                    written.len(),
                    entries.len()
                );
                if let Err(rollback_err) = self.index.delete(&written).await {
                    error!("{source_id}: rollback delete failed: {rollback_err}");
                }
                return Err(SyncError::IndexWrite {
                    source_id: source_id.to_string(),
                    source: e,
                });
            }
            written.push(entry.id.clone());
        }

        debug!("{source_id}: wrote {} entries", entries.len());
        Ok(entries.len())
    }

    /// Load, split, and embed one source into ready-to-write entries.
    async fn build_entries(&self, source_id: &str) -> Result<Vec<IndexEntry>, SyncError> {
        let path = Path::new(source_id);
        let pages = self.loader.load(path).await?;

        let source_mtime = tokio::fs::metadata(path)
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64);

        let mut texts: Vec<String> = Vec::new();
        let mut provenance: Vec<(usize, usize)> = Vec::new();
        for page in &pages {
            for window in self.splitter.split(&page.text) {
                provenance.push((page.page_number, window.sequence));
                texts.push(window.text);
            }
        }

        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let embedded =
            self.provider
                .embed_texts(&texts)
                .await
                .map_err(|e| SyncError::Embed {
                    source_id: source_id.to_string(),
                    source: e,
                })?;
        if embedded.len() != texts.len() {
            return Err(SyncError::Embed {
                source_id: source_id.to_string(),
                source: docdex_embed::EmbedError::invalid_config(format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    embedded.len()
                )),
            });
        }

        let entries = texts
            .into_iter()
            .zip(embedded.embeddings)
            .zip(provenance)
            .map(|((content, embedding), (page, sequence))| IndexEntry {
                id: Uuid::new_v4().to_string(),
                embedding,
                content,
                metadata: EntryMetadata {
                    source_id: source_id.to_string(),
                    page,
                    sequence,
                },
                source_mtime,
            })
            .collect();

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexError, QueryMode, ScoredEntry, SqliteVectorIndex};
    use crate::loader::PlainTextLoader;
    use async_trait::async_trait;
    use docdex_embed::{EmbedError, EmbeddingResult, HashEmbedProvider};
    use half::f16;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn pipeline(
        index: Arc<dyn VectorIndex>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> IngestPipeline {
        IngestPipeline::new(
            WindowConfig::new(40, 10).unwrap(),
            Arc::new(PlainTextLoader::new("txt")),
            provider,
            index,
        )
    }

    /// Embedding provider that always fails.
    struct BrokenProvider;

    #[async_trait]
    impl EmbeddingProvider for BrokenProvider {
        async fn embed_text(&self, _text: &str) -> docdex_embed::Result<Vec<f16>> {
            Err(EmbedError::invalid_config("backend unavailable"))
        }

        async fn embed_texts(&self, _texts: &[String]) -> docdex_embed::Result<EmbeddingResult> {
            Err(EmbedError::invalid_config("backend unavailable"))
        }

        fn embedding_dimension(&self) -> usize {
            8
        }

        fn provider_name(&self) -> &str {
            "broken"
        }
    }

    /// Embedding provider that hangs forever.
    struct HangingProvider;

    #[async_trait]
    impl EmbeddingProvider for HangingProvider {
        async fn embed_text(&self, _text: &str) -> docdex_embed::Result<Vec<f16>> {
            std::future::pending().await
        }

        async fn embed_texts(&self, _texts: &[String]) -> docdex_embed::Result<EmbeddingResult> {
            std::future::pending().await
        }

        fn embedding_dimension(&self) -> usize {
            8
        }

        fn provider_name(&self) -> &str {
            "hanging"
        }
    }

    /// Index wrapper that fails the nth add call.
    struct FlakyIndex {
        inner: SqliteVectorIndex,
        adds: AtomicUsize,
        fail_on: usize,
    }

    #[async_trait]
    impl VectorIndex for FlakyIndex {
        async fn add(&self, entry: &IndexEntry) -> Result<(), IndexError> {
            let n = self.adds.fetch_add(1, Ordering::SeqCst);
            if n + 1 == self.fail_on {
                return Err(IndexError::Corrupt {
                    id: entry.id.clone(),
                    message: "injected write failure".to_string(),
                });
            }
            self.inner.add(entry).await
        }

        async fn delete(&self, ids: &[EntryId]) -> Result<usize, IndexError> {
            self.inner.delete(ids).await
        }

        async fn list_all(&self) -> Result<Vec<crate::index::EntryHead>, IndexError> {
            self.inner.list_all().await
        }

        async fn query(
            &self,
            vector: &[f16],
            k: usize,
            mode: QueryMode,
        ) -> Result<Vec<ScoredEntry>, IndexError> {
            self.inner.query(vector, k, mode).await
        }

        async fn ensure_model(&self, name: &str, dimension: usize) -> Result<(), IndexError> {
            self.inner.ensure_model(name, dimension).await
        }
    }

    #[tokio::test]
    async fn test_ingest_writes_all_windows() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let source = dir.path().join("doc.txt");
        let long_text: String = (0..20).map(|i| format!("sentence number {i}. ")).collect();
        tokio::fs::write(&source, &long_text).await?;

        let index = Arc::new(SqliteVectorIndex::open_memory().await?);
        let pipeline = pipeline(index.clone(), Arc::new(HashEmbedProvider::new(16)));

        let source_id = source.to_string_lossy().to_string();
        let count = pipeline
            .ingest_source(&source_id, Duration::from_secs(10))
            .await?;

        assert!(count > 1, "expected multiple windows, got {count}");
        let heads = index.list_all().await?;
        assert_eq!(heads.len(), count);
        assert!(heads.iter().all(|h| h.source_id == source_id));
        Ok(())
    }

    #[tokio::test]
    async fn test_whitespace_source_yields_zero_entries() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let source = dir.path().join("blank.txt");
        tokio::fs::write(&source, "   \n\n  ").await?;

        let index = Arc::new(SqliteVectorIndex::open_memory().await?);
        let pipeline = pipeline(index.clone(), Arc::new(HashEmbedProvider::new(16)));

        let count = pipeline
            .ingest_source(&source.to_string_lossy(), Duration::from_secs(10))
            .await?;
        assert_eq!(count, 0);
        assert!(index.list_all().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_embed_failure_leaves_nothing_behind() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let source = dir.path().join("doc.txt");
        tokio::fs::write(&source, "some content to embed").await?;

        let index = Arc::new(SqliteVectorIndex::open_memory().await?);
        let pipeline = pipeline(index.clone(), Arc::new(BrokenProvider));

        let result = pipeline
            .ingest_source(&source.to_string_lossy(), Duration::from_secs(10))
            .await;

        assert!(matches!(result, Err(SyncError::Embed { .. })));
        assert!(index.list_all().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_write_failure_rolls_back_partial_entries() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let source = dir.path().join("doc.txt");
        let long_text: String = (0..30).map(|i| format!("sentence number {i}. ")).collect();
        tokio::fs::write(&source, &long_text).await?;

        let flaky = Arc::new(FlakyIndex {
            inner: SqliteVectorIndex::open_memory().await?,
            adds: AtomicUsize::new(0),
            fail_on: 3,
        });
        let pipeline = pipeline(flaky.clone(), Arc::new(HashEmbedProvider::new(16)));

        let result = pipeline
            .ingest_source(&source.to_string_lossy(), Duration::from_secs(10))
            .await;

        assert!(matches!(result, Err(SyncError::IndexWrite { .. })));
        // The two entries written before the failure were rolled back.
        assert!(flaky.list_all().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_hanging_build_hits_deadline() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let source = dir.path().join("doc.txt");
        tokio::fs::write(&source, "content").await?;

        let index = Arc::new(SqliteVectorIndex::open_memory().await?);
        let pipeline = pipeline(index.clone(), Arc::new(HangingProvider));

        let result = pipeline
            .ingest_source(&source.to_string_lossy(), Duration::from_millis(50))
            .await;

        assert!(matches!(result, Err(SyncError::Timeout { .. })));
        assert!(index.list_all().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_reingest_mints_fresh_ids() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let source = dir.path().join("doc.txt");
        tokio::fs::write(&source, "stable content").await?;

        let index = Arc::new(SqliteVectorIndex::open_memory().await?);
        let pipeline = pipeline(index.clone(), Arc::new(HashEmbedProvider::new(16)));
        let source_id = source.to_string_lossy().to_string();

        pipeline
            .ingest_source(&source_id, Duration::from_secs(10))
            .await?;
        let first: Vec<String> = index.list_all().await?.into_iter().map(|h| h.id).collect();

        pipeline
            .ingest_source(&source_id, Duration::from_secs(10))
            .await?;
        let second: Vec<String> = index.list_all().await?.into_iter().map(|h| h.id).collect();

        // Re-running ingest without a prior delete duplicates content
        // under new ids, which is why the reconciler never ingests a
        // source already present in the index.
        assert_eq!(second.len(), first.len() * 2);
        for id in &first {
            assert!(second.contains(id));
        }
        Ok(())
    }
}
