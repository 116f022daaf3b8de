//! Embedding providers for docdex.
//!
//! This crate defines the embedding boundary the indexing and retrieval
//! pipelines depend on: a provider maps text to a fixed-length vector,
//! deterministically for a given model and input.
//!
//! Two implementations are provided:
//!
//! - [`FastEmbedProvider`]: real semantic embeddings from fastembed's
//!   built-in ONNX models, cached per process.
//! - [`HashEmbedProvider`]: deterministic token-hash vectors with no
//!   model download, for tests and offline runs.
//!
//! One model identity per index: vectors produced by different models
//! live in incompatible spaces, so the index records the model it was
//! built with and rejects providers that do not match.

pub mod config;
pub mod error;
pub mod hash;
pub mod provider;

pub use config::EmbedConfig;
pub use error::{EmbedError, Result};
pub use hash::HashEmbedProvider;
pub use provider::{EmbeddingProvider, EmbeddingResult, FastEmbedProvider};
