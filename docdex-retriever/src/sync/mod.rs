//! Index synchronization engine.
//!
//! Keeps a persisted vector index consistent with the current contents of
//! a source directory across repeated runs. One reconciliation pass is a
//! run-to-completion cycle:
//!
//! ```text
//! scan directory → inspect index → plan (set diff) → ingest adds → apply deletes
//! ```
//!
//! Identity is purely by source path: a file added to the directory is
//! ingested, a file removed from the directory has every one of its
//! entries deleted, and a file present in both is left untouched; its
//! content is never re-embedded. A file whose content changes under an
//! unchanged path is therefore not detected. That is a property of the
//! path-based model, not an accident.
//!
//! After a successful pass the set of source ids in the index equals
//! exactly the set of eligible files found by the directory scan at the
//! start of that pass. Per-source ingest failures leave the affected
//! source fully absent (to be retried next pass) and never abort the
//! rest of the pass.

pub mod ingest;
pub mod inspector;
pub mod reconciler;
pub mod scanner;

pub use ingest::IngestPipeline;
pub use reconciler::{ReconciliationPlan, Reconciler, SourceFailure, SyncReport};
