//! Deterministic hash-based embedding provider.
//!
//! Maps text into a fixed-dimension vector by hashing whitespace tokens
//! into buckets and L2-normalizing the bucket counts. The vectors carry
//! no semantics beyond token overlap, but the provider is fully
//! deterministic with no model download, which is what tests and
//! offline smoke runs need from the embedding boundary.

use crate::error::{EmbedError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingResult};
use async_trait::async_trait;
use fnv::FnvHasher;
use half::f16;
use std::hash::Hasher;

/// Token-hashing embedding provider with a fixed output dimension.
#[derive(Debug, Clone)]
pub struct HashEmbedProvider {
    dimension: usize,
}

impl HashEmbedProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f16> {
        let mut buckets = vec![0.0f32; self.dimension];

        for token in text.split_whitespace() {
            let mut hasher = FnvHasher::default();
            hasher.write(token.to_lowercase().as_bytes());
            let bucket = (hasher.finish() % self.dimension as u64) as usize;
            buckets[bucket] += 1.0;
        }

        let norm = buckets.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut buckets {
                *value /= norm;
            }
        }

        buckets.into_iter().map(f16::from_f32).collect()
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f16>> {
        if self.dimension == 0 {
            return Err(EmbedError::invalid_config("dimension must be non-zero"));
        }
        Ok(self.embed_one(text))
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if self.dimension == 0 {
            return Err(EmbedError::invalid_config("dimension must be non-zero"));
        }
        let embeddings = texts.iter().map(|t| self.embed_one(t)).collect();
        Ok(EmbeddingResult::new(embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "hash"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deterministic_output() {
        let provider = HashEmbedProvider::new(64);

        let a = provider.embed_text("the quick brown fox").await.unwrap();
        let b = provider.embed_text("the quick brown fox").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_distinct_texts_differ() {
        let provider = HashEmbedProvider::new(64);

        let a = provider.embed_text("alpha beta gamma").await.unwrap();
        let b = provider.embed_text("delta epsilon zeta").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_vectors_are_normalized() {
        let provider = HashEmbedProvider::new(32);

        let vector = provider.embed_text("one two three four").await.unwrap();
        let norm: f32 = vector.iter().map(|v| v.to_f32() * v.to_f32()).sum();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let provider = HashEmbedProvider::new(16);

        let vector = provider.embed_text("").await.unwrap();
        assert!(vector.iter().all(|v| v.to_f32() == 0.0));
    }

    #[tokio::test]
    async fn test_batch_matches_single() {
        let provider = HashEmbedProvider::new(48);
        let texts = vec!["first text".to_string(), "second text".to_string()];

        let batch = provider.embed_texts(&texts).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.dimension, 48);

        let single = provider.embed_text("first text").await.unwrap();
        assert_eq!(batch.embeddings[0], single);
    }
}
