//! SQLite-backed vector index.
//!
//! Entries live in a single `entries` table with the embedding stored as
//! an f16 blob; the `embedding_models` table pins the model identity the
//! index was built with. Nearest-neighbor search is a brute-force scan:
//! decode every embedding, score it against the query, sort. That is the
//! right trade for corpora of document chunks that fit comfortably in
//! memory, and it keeps the storage schema trivial.
//!
//! ## SQLite configuration
//!
//! - **WAL mode**: better concurrency for read/write operations
//! - **Large page size** (64KB): suits embedding blob storage
//! - **Auto-vacuum**: keeps the database size manageable

use super::{
    EntryHead, EntryId, EntryMetadata, IndexEntry, IndexError, QueryMode, ScoredEntry, VectorIndex,
    mmr,
};
use async_trait::async_trait;
use half::f16;
use serde::Serialize;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::debug;

/// Database file name inside the index directory.
const DB_FILE: &str = "docdex.db";

/// SQLite-backed implementation of [`VectorIndex`].
#[derive(Clone, Debug)]
pub struct SqliteVectorIndex {
    pool: SqlitePool,
}

/// One fully decoded entry row, for listings and JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct EntryRecord {
    pub id: EntryId,
    pub source_id: String,
    pub page: usize,
    pub sequence: usize,
    pub content: String,
}

/// Aggregate index statistics.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub entries: usize,
    pub sources: usize,
    pub model: Option<ModelInfo>,
}

/// The embedding model the index was built with.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub dimension: usize,
}

impl SqliteVectorIndex {
    /// Open (or create) a persisted index under `index_dir`.
    ///
    /// An absent directory means "empty index": it is created along with
    /// the database file on first open.
    pub async fn open(index_dir: &Path) -> Result<Self, IndexError> {
        tokio::fs::create_dir_all(index_dir)
            .await
            .map_err(|e| IndexError::Storage(sqlx::Error::Io(e)))?;
        let db_path = index_dir.join(DB_FILE);

        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(db_path)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .foreign_keys(true)
                .create_if_missing(true)
                .auto_vacuum(sqlx::sqlite::SqliteAutoVacuum::Full)
                .page_size(1 << 16)
                .optimize_on_close(true, 1 << 10),
        )
        .await?;
        Self::new_with_pool(pool).await
    }

    /// Open an in-memory index for testing.
    pub async fn open_memory() -> Result<Self, IndexError> {
        let pool = SqlitePool::connect("sqlite::memory:").await?;
        Self::new_with_pool(pool).await
    }

    async fn new_with_pool(pool: SqlitePool) -> Result<Self, IndexError> {
        Self::create_tables(&pool).await?;
        Ok(Self { pool })
    }

    async fn create_tables(pool: &SqlitePool) -> Result<(), IndexError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                id TEXT PRIMARY KEY,
                source_id TEXT NOT NULL,
                page INTEGER NOT NULL,
                sequence INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                source_mtime INTEGER,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS embedding_models (
                name TEXT NOT NULL,
                dimension INTEGER NOT NULL,
                registered_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_source ON entries(source_id)")
            .execute(pool)
            .await?;

        Ok(())
    }

    fn decode_embedding(id: &str, bytes: &[u8]) -> Result<Vec<f16>, IndexError> {
        if bytes.len() % 2 != 0 {
            return Err(IndexError::Corrupt {
                id: id.to_string(),
                message: format!("embedding blob has odd length {}", bytes.len()),
            });
        }
        Ok(bytemuck::pod_collect_to_vec::<u8, f16>(bytes))
    }

    /// List up to `limit` entries, optionally filtered by source.
    pub async fn list_records(
        &self,
        source_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<EntryRecord>, IndexError> {
        let rows = if let Some(source_id) = source_id {
            sqlx::query(
                "SELECT id, source_id, page, sequence, content FROM entries
                 WHERE source_id = ?1 ORDER BY source_id, page, sequence LIMIT ?2",
            )
            .bind(source_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT id, source_id, page, sequence, content FROM entries
                 ORDER BY source_id, page, sequence LIMIT ?1",
            )
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?
        };

        let mut records = Vec::new();
        for row in rows {
            let page: i64 = row.get("page");
            let sequence: i64 = row.get("sequence");
            records.push(EntryRecord {
                id: row.get("id"),
                source_id: row.get("source_id"),
                page: page as usize,
                sequence: sequence as usize,
                content: row.get("content"),
            });
        }
        Ok(records)
    }

    /// Aggregate statistics over the stored index.
    pub async fn stats(&self) -> Result<IndexStats, IndexError> {
        let entries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries")
            .fetch_one(&self.pool)
            .await?;
        let sources: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT source_id) FROM entries")
            .fetch_one(&self.pool)
            .await?;
        let model = sqlx::query("SELECT name, dimension FROM embedding_models LIMIT 1")
            .fetch_optional(&self.pool)
            .await?
            .map(|row| {
                let dimension: i64 = row.get("dimension");
                ModelInfo {
                    name: row.get("name"),
                    dimension: dimension as usize,
                }
            });

        Ok(IndexStats {
            entries: entries as usize,
            sources: sources as usize,
            model,
        })
    }

    /// Get the underlying SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn add(&self, entry: &IndexEntry) -> Result<(), IndexError> {
        let embedding_bytes = bytemuck::cast_slice::<f16, u8>(&entry.embedding);

        sqlx::query(
            r#"
            INSERT INTO entries (id, source_id, page, sequence, content, embedding, source_mtime)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.metadata.source_id)
        .bind(entry.metadata.page as i64)
        .bind(entry.metadata.sequence as i64)
        .bind(&entry.content)
        .bind(embedding_bytes)
        .bind(entry.source_mtime)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, ids: &[EntryId]) -> Result<usize, IndexError> {
        if ids.is_empty() {
            return Ok(0);
        }

        // Build a query with placeholders
        let placeholders = ids
            .iter()
            .enumerate()
            .map(|(i, _)| format!("?{}", i + 1))
            .collect::<Vec<_>>()
            .join(", ");

        let query = format!("DELETE FROM entries WHERE id IN ({placeholders})");
        let mut query_builder = sqlx::query(&query);
        for id in ids {
            query_builder = query_builder.bind(id);
        }

        let result = query_builder.execute(&self.pool).await?;
        Ok(result.rows_affected() as usize)
    }

    async fn list_all(&self) -> Result<Vec<EntryHead>, IndexError> {
        let rows = sqlx::query(
            "SELECT id, source_id FROM entries ORDER BY source_id, page, sequence",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| EntryHead {
                id: row.get("id"),
                source_id: row.get("source_id"),
            })
            .collect())
    }

    async fn query(
        &self,
        vector: &[f16],
        k: usize,
        mode: QueryMode,
    ) -> Result<Vec<ScoredEntry>, IndexError> {
        let rows = sqlx::query(
            "SELECT id, source_id, page, sequence, content, embedding FROM entries",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("id");
            let embedding_bytes: Vec<u8> = row.get("embedding");
            let embedding = Self::decode_embedding(&id, &embedding_bytes)?;
            let score = mmr::cosine_similarity(vector, &embedding);

            let page: i64 = row.get("page");
            let sequence: i64 = row.get("sequence");
            let entry = ScoredEntry {
                id,
                content: row.get("content"),
                metadata: EntryMetadata {
                    source_id: row.get("source_id"),
                    page: page as usize,
                    sequence: sequence as usize,
                },
                score,
            };
            candidates.push((entry, embedding));
        }

        candidates.sort_by(|a, b| {
            b.0.score
                .partial_cmp(&a.0.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let results = match mode {
            QueryMode::Similarity => {
                candidates.truncate(k);
                candidates.into_iter().map(|(entry, _)| entry).collect()
            }
            QueryMode::Mmr { lambda, fetch_k } => {
                candidates.truncate(fetch_k.max(k));
                let embeddings: Vec<Vec<f16>> =
                    candidates.iter().map(|(_, e)| e.clone()).collect();
                let selected = mmr::maximal_marginal_relevance(vector, &embeddings, k, lambda);
                debug!(
                    "MMR selected {} of {} candidates",
                    selected.len(),
                    embeddings.len()
                );
                selected
                    .into_iter()
                    .map(|i| candidates[i].0.clone())
                    .collect()
            }
        };

        Ok(results)
    }

    async fn ensure_model(&self, name: &str, dimension: usize) -> Result<(), IndexError> {
        let registered = sqlx::query("SELECT name, dimension FROM embedding_models LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;

        match registered {
            None => {
                sqlx::query("INSERT INTO embedding_models (name, dimension) VALUES (?1, ?2)")
                    .bind(name)
                    .bind(dimension as i64)
                    .execute(&self.pool)
                    .await?;
                debug!("Registered embedding model {name} ({dimension}d)");
                Ok(())
            }
            Some(row) => {
                let registered_name: String = row.get("name");
                let registered_dim: i64 = row.get("dimension");
                if registered_name == name && registered_dim as usize == dimension {
                    Ok(())
                } else {
                    Err(IndexError::ModelMismatch {
                        registered: registered_name,
                        registered_dim: registered_dim as usize,
                        requested: name.to_string(),
                        requested_dim: dimension,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, source_id: &str, page: usize, sequence: usize, v: &[f32]) -> IndexEntry {
        IndexEntry {
            id: id.to_string(),
            embedding: v.iter().copied().map(f16::from_f32).collect(),
            content: format!("content of {id}"),
            metadata: EntryMetadata {
                source_id: source_id.to_string(),
                page,
                sequence,
            },
            source_mtime: Some(1_700_000_000),
        }
    }

    #[tokio::test]
    async fn test_add_list_delete_roundtrip() -> anyhow::Result<()> {
        let index = SqliteVectorIndex::open_memory().await?;

        index.add(&entry("e1", "/docs/a.pdf", 1, 0, &[1.0, 0.0])).await?;
        index.add(&entry("e2", "/docs/a.pdf", 1, 1, &[0.0, 1.0])).await?;
        index.add(&entry("e3", "/docs/b.pdf", 1, 0, &[0.5, 0.5])).await?;

        let heads = index.list_all().await?;
        assert_eq!(heads.len(), 3);
        assert_eq!(heads[0].source_id, "/docs/a.pdf");

        let removed = index
            .delete(&["e1".to_string(), "e2".to_string()])
            .await?;
        assert_eq!(removed, 2);

        let heads = index.list_all().await?;
        assert_eq!(heads.len(), 1);
        assert_eq!(heads[0].id, "e3");
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_index_lists_empty() -> anyhow::Result<()> {
        let index = SqliteVectorIndex::open_memory().await?;
        assert!(index.list_all().await?.is_empty());
        assert_eq!(index.stats().await?.entries, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_missing_ids_is_noop() -> anyhow::Result<()> {
        let index = SqliteVectorIndex::open_memory().await?;
        index.add(&entry("e1", "/docs/a.pdf", 1, 0, &[1.0, 0.0])).await?;

        let removed = index
            .delete(&["e1".to_string(), "ghost".to_string()])
            .await?;
        assert_eq!(removed, 1);
        assert_eq!(index.delete(&["ghost".to_string()]).await?, 0);
        assert_eq!(index.delete(&[]).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_similarity_query_orders_by_score() -> anyhow::Result<()> {
        let index = SqliteVectorIndex::open_memory().await?;
        index.add(&entry("far", "/docs/a.pdf", 1, 0, &[0.0, 1.0])).await?;
        index.add(&entry("near", "/docs/a.pdf", 1, 1, &[1.0, 0.1])).await?;
        index.add(&entry("mid", "/docs/b.pdf", 1, 0, &[0.7, 0.7])).await?;

        let query: Vec<f16> = [1.0f32, 0.0].iter().copied().map(f16::from_f32).collect();
        let hits = index.query(&query, 2, QueryMode::Similarity).await?;

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "near");
        assert_eq!(hits[1].id, "mid");
        assert!(hits[0].score > hits[1].score);
        Ok(())
    }

    #[tokio::test]
    async fn test_mmr_query_avoids_redundant_hits() -> anyhow::Result<()> {
        let index = SqliteVectorIndex::open_memory().await?;
        index.add(&entry("dup1", "/docs/a.pdf", 1, 0, &[0.92, 0.39])).await?;
        index.add(&entry("dup2", "/docs/a.pdf", 1, 1, &[0.92, 0.391])).await?;
        index.add(&entry("other", "/docs/b.pdf", 1, 0, &[0.9, -0.436])).await?;

        let query: Vec<f16> = [1.0f32, 0.0].iter().copied().map(f16::from_f32).collect();
        let hits = index
            .query(
                &query,
                2,
                QueryMode::Mmr {
                    lambda: 0.5,
                    fetch_k: 10,
                },
            )
            .await?;

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "dup1");
        assert_eq!(hits[1].id, "other");
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_model_registers_then_rejects_mismatch() -> anyhow::Result<()> {
        let index = SqliteVectorIndex::open_memory().await?;

        index.ensure_model("all-minilm-l6-v2", 384).await?;
        // Same model is accepted on a later open.
        index.ensure_model("all-minilm-l6-v2", 384).await?;

        let err = index.ensure_model("bge-small-en-v1.5", 384).await;
        assert!(matches!(err, Err(IndexError::ModelMismatch { .. })));

        let err = index.ensure_model("all-minilm-l6-v2", 768).await;
        assert!(matches!(err, Err(IndexError::ModelMismatch { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_persistent_open_creates_directory() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let index_dir = temp.path().join("nested").join("index");

        let index = SqliteVectorIndex::open(&index_dir).await?;
        index.add(&entry("e1", "/docs/a.pdf", 1, 0, &[1.0, 0.0])).await?;
        drop(index);

        // Reopening sees the persisted entry.
        let reopened = SqliteVectorIndex::open(&index_dir).await?;
        assert_eq!(reopened.list_all().await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_stats_counts_sources() -> anyhow::Result<()> {
        let index = SqliteVectorIndex::open_memory().await?;
        index.add(&entry("e1", "/docs/a.pdf", 1, 0, &[1.0, 0.0])).await?;
        index.add(&entry("e2", "/docs/a.pdf", 2, 0, &[0.0, 1.0])).await?;
        index.add(&entry("e3", "/docs/b.pdf", 1, 0, &[0.5, 0.5])).await?;
        index.ensure_model("all-minilm-l6-v2", 2).await?;

        let stats = index.stats().await?;
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.sources, 2);
        assert_eq!(stats.model.unwrap().name, "all-minilm-l6-v2");
        Ok(())
    }
}
