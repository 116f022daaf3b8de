//! The index reconciler.
//!
//! Computes and applies the minimal set of index mutations that make the
//! index's source set equal the directory's source set: a two-way set
//! difference over source identifiers, incremental ingest for sources
//! new to the directory, and bulk deletion for sources that left it.
//! Sources present in both sets are untouched; their content is never
//! re-embedded.

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::index::VectorIndex;
use crate::loader::{DocumentLoader, loader_for_extension};
use crate::sync::ingest::IngestPipeline;
use crate::sync::{inspector, scanner};
use docdex_embed::EmbeddingProvider;
use futures::StreamExt;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// The mutation plan for one pass, computed once from a directory
/// snapshot and an index listing. `to_add` and `to_delete` are disjoint
/// by construction: a source cannot be both present in the directory and
/// absent from it within one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub to_add: BTreeSet<String>,
    pub to_delete: BTreeSet<String>,
}

impl ReconciliationPlan {
    /// Set difference in both directions.
    pub fn diff(directory: &BTreeSet<String>, indexed: &BTreeSet<String>) -> Self {
        Self {
            to_add: directory.difference(indexed).cloned().collect(),
            to_delete: indexed.difference(directory).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_delete.is_empty()
    }
}

/// One source that failed to ingest, with the rendered error.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFailure {
    pub source_id: String,
    pub error: String,
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// Sources newly ingested this pass
    pub added: Vec<String>,
    /// Sources whose entries were removed this pass
    pub deleted: Vec<String>,
    /// Sources that failed to ingest and remain absent from the index
    pub failed: Vec<SourceFailure>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs reconciliation passes for one directory/index pair.
///
/// All behavior comes from the [`SyncConfig`] supplied at construction;
/// several reconcilers over different pairs coexist in one process.
/// Passes against the same reconciler are serialized by a run-scoped
/// lock, since interleaved mutations of one index would break the
/// source-fully-present-or-fully-absent invariant.
pub struct Reconciler {
    config: SyncConfig,
    index: Arc<dyn VectorIndex>,
    provider: Arc<dyn EmbeddingProvider>,
    loader: Arc<dyn DocumentLoader>,
    run_lock: Mutex<()>,
}

impl Reconciler {
    /// Create a reconciler, validating the window parameters up front.
    pub fn new(
        config: SyncConfig,
        index: Arc<dyn VectorIndex>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, SyncError> {
        config.window_config()?;
        let loader = loader_for_extension(&config.source_extension);
        Ok(Self {
            config,
            index,
            provider,
            loader,
            run_lock: Mutex::new(()),
        })
    }

    /// Replace the document loader (the format seam used by tests and
    /// embedders of non-default formats).
    pub fn with_loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run one scan → inspect → plan → apply pass.
    ///
    /// Per-source ingest failures are recorded in the report and leave
    /// the source absent, to be retried next pass. Scanner, inspector,
    /// and delete failures abort the run.
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let _guard = self.run_lock.lock().await;

        self.index
            .ensure_model(
                &self.config.embedding.model_name,
                self.provider.embedding_dimension(),
            )
            .await
            .map_err(SyncError::Index)?;

        let directory_sources =
            scanner::scan_sources(&self.config.root, &self.config.source_extension).await?;
        let index_map = inspector::source_map(self.index.as_ref()).await?;
        let indexed_sources: BTreeSet<String> = index_map.keys().cloned().collect();

        let plan = ReconciliationPlan::diff(&directory_sources, &indexed_sources);
        info!(
            "Reconciling {}: {} in directory, {} indexed, {} to add, {} to delete",
            self.config.root.display(),
            directory_sources.len(),
            indexed_sources.len(),
            plan.to_add.len(),
            plan.to_delete.len()
        );

        let mut report = SyncReport::default();

        // Ingest the add-set with bounded concurrency. Each source gets
        // its own deadline and its own failure; the pass continues
        // regardless.
        let pipeline = IngestPipeline::new(
            self.config.window_config()?,
            Arc::clone(&self.loader),
            Arc::clone(&self.provider),
            Arc::clone(&self.index),
        );
        let deadline = self.config.source_timeout;

        let outcomes: Vec<(String, Result<usize, SyncError>)> =
            futures::stream::iter(plan.to_add.iter().cloned().map(|source_id| {
                let pipeline = pipeline.clone();
                async move {
                    let outcome = pipeline.ingest_source(&source_id, deadline).await;
                    (source_id, outcome)
                }
            }))
            .buffer_unordered(self.config.max_workers.max(1))
            .collect()
            .await;

        for (source_id, outcome) in outcomes {
            match outcome {
                Ok(count) => {
                    debug!("{source_id}: added with {count} entries");
                    report.added.push(source_id);
                }
                Err(e) if e.is_source_scoped() => {
                    warn!("{source_id}: ingest failed: {e}");
                    report.failed.push(SourceFailure {
                        source_id,
                        error: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        // Remove every entry recorded for sources that left the
        // directory. Ids already gone (say, after an interrupted earlier
        // pass) delete as no-ops.
        for source_id in &plan.to_delete {
            let ids = index_map.get(source_id).cloned().unwrap_or_default();
            let removed = self
                .index
                .delete(&ids)
                .await
                .map_err(SyncError::IndexDelete)?;
            debug!("{source_id}: removed {removed} entries");
            report.deleted.push(source_id.clone());
        }

        report.added.sort();
        report.deleted.sort();
        report
            .failed
            .sort_by(|a, b| a.source_id.cmp(&b.source_id));

        info!(
            "Pass complete: {} added, {} deleted, {} failed",
            report.added.len(),
            report.deleted.len(),
            report.failed.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_diff_fresh_index() {
        let plan = ReconciliationPlan::diff(&set(&["a.pdf", "b.pdf"]), &set(&[]));
        assert_eq!(plan.to_add, set(&["a.pdf", "b.pdf"]));
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn test_diff_removed_source() {
        let plan = ReconciliationPlan::diff(&set(&["a.pdf"]), &set(&["a.pdf", "b.pdf"]));
        assert!(plan.to_add.is_empty());
        assert_eq!(plan.to_delete, set(&["b.pdf"]));
    }

    #[test]
    fn test_diff_mixed_change() {
        let plan = ReconciliationPlan::diff(&set(&["a.pdf", "c.pdf"]), &set(&["a.pdf", "b.pdf"]));
        assert_eq!(plan.to_add, set(&["c.pdf"]));
        assert_eq!(plan.to_delete, set(&["b.pdf"]));
    }

    #[test]
    fn test_diff_no_change_is_empty() {
        let plan = ReconciliationPlan::diff(&set(&["a.pdf"]), &set(&["a.pdf"]));
        assert!(plan.is_empty());
    }

    #[test]
    fn test_diff_sets_are_disjoint() {
        let directory = set(&["a.pdf", "b.pdf", "c.pdf"]);
        let indexed = set(&["b.pdf", "d.pdf", "e.pdf"]);
        let plan = ReconciliationPlan::diff(&directory, &indexed);

        assert!(plan.to_add.is_disjoint(&plan.to_delete));
    }
}
