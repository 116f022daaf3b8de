//! docdex-retriever: directory-synchronized vector index for document QA
//!
//! This crate ingests a directory of source documents, splits them into
//! retrievable chunks, embeds them, keeps a persisted vector index
//! consistent with the directory across repeated runs, and answers
//! questions over the indexed chunks.
//!
//! ## Key Modules
//!
//! - **[`sync`]**: the index synchronization engine (directory scan,
//!   index inspection, reconciliation plan, incremental ingest, deletion)
//! - **[`index`]**: the persisted vector index boundary and its SQLite
//!   implementation
//! - **[`loader`]**: document loading (PDF and plain text)
//! - **[`retrieval`]**: diversity-aware retrieval and answer generation
//! - **[`config`]**: explicit per-pair configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docdex_retriever::config::SyncConfig;
//! use docdex_retriever::index::SqliteVectorIndex;
//! use docdex_retriever::sync::Reconciler;
//! use docdex_embed::HashEmbedProvider;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = SyncConfig::new(PathBuf::from("data"), PathBuf::from(".docdex"));
//! let index = Arc::new(SqliteVectorIndex::open(&config.index_dir).await?);
//! let provider = Arc::new(HashEmbedProvider::new(256));
//!
//! let reconciler = Reconciler::new(config, index, provider)?;
//! let report = reconciler.run().await?;
//! println!("added {} sources", report.added.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Directory ─ scan ─┐
//!                   ├─ plan (set diff) ─ ingest adds ─ apply deletes
//! Index ─ inspect ──┘                        │
//!                                  load → window → embed → write
//! ```

pub mod config;
pub mod error;
pub mod index;
pub mod loader;
pub mod retrieval;
pub mod sync;

pub use error::SyncError;
