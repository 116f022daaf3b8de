//! The persisted vector index boundary.
//!
//! An index stores `(id, vector, metadata)` triples and supports four
//! operations: add by id, delete by ids, full listing, and
//! nearest-neighbor query. Entries are never mutated in place; a content
//! change is modeled as delete-then-add by the sync engine.
//!
//! The index also pins the embedding model it was built with: mixing
//! vectors from different models silently corrupts nearest-neighbor
//! semantics, so [`VectorIndex::ensure_model`] registers the model on
//! first use and rejects mismatching opens afterwards.

use async_trait::async_trait;
use half::f16;
use serde::Serialize;

pub mod mmr;
pub mod sqlite;

pub use sqlite::SqliteVectorIndex;

/// Entry identifier: a UUID minted at ingest time.
pub type EntryId = String;

/// Errors from the index storage layer.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Underlying storage failure
    #[error("index storage failure: {0}")]
    Storage(#[from] sqlx::Error),

    /// The index was built with a different embedding model
    #[error(
        "embedding model mismatch: index was built with {registered} ({registered_dim}d), \
         configured model is {requested} ({requested_dim}d)"
    )]
    ModelMismatch {
        registered: String,
        registered_dim: usize,
        requested: String,
        requested_dim: usize,
    },

    /// A stored row could not be decoded
    #[error("corrupt index entry {id}: {message}")]
    Corrupt { id: String, message: String },
}

/// Provenance metadata attached to every entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryMetadata {
    /// Owning source document (normalized absolute path)
    pub source_id: String,
    /// 1-based page number within the source
    pub page: usize,
    /// Window sequence within the page
    pub sequence: usize,
}

/// A complete entry as written by the ingest pipeline.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: EntryId,
    pub embedding: Vec<f16>,
    pub content: String,
    pub metadata: EntryMetadata,
    /// Source file modification time at ingest (unix seconds), when known
    pub source_mtime: Option<i64>,
}

/// Listing view: entry id plus owning source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHead {
    pub id: EntryId,
    pub source_id: String,
}

/// A query hit with its relevance score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredEntry {
    pub id: EntryId,
    pub content: String,
    pub metadata: EntryMetadata,
    pub score: f32,
}

/// Nearest-neighbor selection policy.
#[derive(Debug, Clone, Copy)]
pub enum QueryMode {
    /// Plain top-k by cosine similarity
    Similarity,
    /// Maximal marginal relevance: top `fetch_k` candidates by
    /// similarity, then greedy selection balancing relevance against
    /// redundancy with already-selected results
    Mmr { lambda: f32, fetch_k: usize },
}

/// Persisted vector store interface.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Write one `(id, vector, metadata)` triple.
    async fn add(&self, entry: &IndexEntry) -> Result<(), IndexError>;

    /// Delete the given entry ids. Ids that are already absent are
    /// ignored; returns the number of entries actually removed.
    async fn delete(&self, ids: &[EntryId]) -> Result<usize, IndexError>;

    /// List every stored entry's id and owning source. An empty index
    /// yields an empty listing.
    async fn list_all(&self) -> Result<Vec<EntryHead>, IndexError>;

    /// Return the `k` best entries for the query vector under the given
    /// selection policy, best first.
    async fn query(
        &self,
        vector: &[f16],
        k: usize,
        mode: QueryMode,
    ) -> Result<Vec<ScoredEntry>, IndexError>;

    /// Register the embedding model on first use; error if the index was
    /// built with a different model or dimension.
    async fn ensure_model(&self, name: &str, dimension: usize) -> Result<(), IndexError>;
}
