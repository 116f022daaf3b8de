//! Retrieval and question answering over the synchronized index.
//!
//! Thin orchestration: embed the question, run a diversity-aware
//! nearest-neighbor query, hand the retrieved chunks and the question to
//! an [`AnswerGenerator`]. Results are ordered best-first; there is no
//! determinism guarantee across index mutations between calls.

pub mod answer;

pub use answer::{AnswerGenerator, ChatAnswerGenerator};

use crate::config::RetrievalConfig;
use crate::error::SyncError;
use crate::index::{QueryMode, ScoredEntry, VectorIndex};
use docdex_embed::EmbeddingProvider;
use std::sync::Arc;
use tracing::debug;

/// Retrieves chunks from the index for natural-language queries.
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    provider: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        provider: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            index,
            provider,
            config,
        }
    }

    /// Retrieve the `k` best chunks for `query` under maximal marginal
    /// relevance, best first.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredEntry>, SyncError> {
        let vector = self
            .provider
            .embed_text(query)
            .await
            .map_err(|e| SyncError::Retrieval {
                message: e.to_string(),
            })?;

        let mode = QueryMode::Mmr {
            lambda: self.config.lambda,
            fetch_k: self.config.fetch_k.max(k),
        };
        let hits = self
            .index
            .query(&vector, k, mode)
            .await
            .map_err(|e| SyncError::Retrieval {
                message: e.to_string(),
            })?;

        debug!("Retrieved {} chunks for query", hits.len());
        Ok(hits)
    }

    /// Retrieve context with the configured `k` and generate an answer.
    pub async fn ask(
        &self,
        generator: &dyn AnswerGenerator,
        question: &str,
    ) -> Result<String, SyncError> {
        let context = self.retrieve(question, self.config.k).await?;
        generator.answer(&context, question).await
    }
}

/// Assemble retrieved chunks into a numbered context block, each tagged
/// with its source and page.
pub fn build_context(chunks: &[ScoredEntry]) -> String {
    if chunks.is_empty() {
        return String::new();
    }

    let mut context = String::from("Relevant document excerpts:\n\n");
    for (i, chunk) in chunks.iter().enumerate() {
        context.push_str(&format!(
            "{}. [{} p.{}] {}\n\n",
            i + 1,
            chunk.metadata.source_id,
            chunk.metadata.page,
            chunk.content.trim()
        ));
    }
    context
}
