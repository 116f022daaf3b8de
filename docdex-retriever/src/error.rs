//! Error types for synchronization and retrieval.
//!
//! Two scopes of failure exist and they propagate differently. Failures
//! scoped to a single source (unreadable file, embedding failure, a write
//! that had to be rolled back, a blown ingest deadline) are caught at the
//! source boundary: the source is recorded as failed and the pass
//! continues, leaving that source absent from the index until a later
//! pass retries it. Failures of the index handle itself (scan of a bad
//! root, listing, deletion, model mismatch) are fatal to the run.

use crate::index::IndexError;
use docdex_context::WindowError;
use docdex_embed::EmbedError;
use std::path::PathBuf;

/// Errors surfaced by the sync engine and the retrieval loop.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The scan root does not exist or is not a directory
    #[error("failed to scan {root}: {message}")]
    Scan { root: PathBuf, message: String },

    /// A source file could not be read or parsed
    #[error("failed to load {source_id}: {message}")]
    Load { source_id: String, message: String },

    /// Window parameters are degenerate (overlap >= window)
    #[error("invalid window configuration: {source}")]
    Split {
        #[from]
        source: WindowError,
    },

    /// The embedding backend failed for one source's chunks
    #[error("embedding failed for {source_id}: {source}")]
    Embed {
        source_id: String,
        #[source]
        source: EmbedError,
    },

    /// A source blew its ingest deadline
    #[error("ingest deadline of {seconds}s exceeded for {source_id}")]
    Timeout { source_id: String, seconds: u64 },

    /// Writing a source's entries failed (the partial write was rolled back)
    #[error("index write failed for {source_id}: {source}")]
    IndexWrite {
        source_id: String,
        #[source]
        source: IndexError,
    },

    /// Removing a deleted source's entries failed
    #[error("index delete failed: {0}")]
    IndexDelete(#[source] IndexError),

    /// Listing the index contents failed
    #[error("index inspection failed: {0}")]
    Inspect(#[source] IndexError),

    /// The index handle is unusable (storage failure, model mismatch)
    #[error("index unusable: {0}")]
    Index(#[source] IndexError),

    /// Query-time failure (query embedding or nearest-neighbor search)
    #[error("retrieval failed: {message}")]
    Retrieval { message: String },

    /// The answer backend failed or returned an unusable response
    #[error("answer generation failed: {message}")]
    Answer { message: String },
}

impl SyncError {
    /// Whether this failure is confined to a single source.
    ///
    /// Source-scoped failures are recorded in the sync report and do not
    /// abort the pass; everything else indicates the index handle or the
    /// run itself is unusable.
    pub fn is_source_scoped(&self) -> bool {
        matches!(
            self,
            SyncError::Load { .. }
                | SyncError::Split { .. }
                | SyncError::Embed { .. }
                | SyncError::Timeout { .. }
                | SyncError::IndexWrite { .. }
        )
    }
}
