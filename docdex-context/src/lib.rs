//! Text windowing for retrieval pipelines.
//!
//! This crate turns page-level text into the overlapping, fixed-size
//! windows that a vector index stores and retrieves. Consecutive windows
//! share a configurable overlap so that a statement falling on a window
//! boundary is still fully contained in at least one window.
//!
//! The splitter is pure and synchronous: it performs no I/O and has no
//! opinion about where the text came from. Callers attach provenance
//! (source path, page number) to the windows they get back.

pub mod window;

pub use window::{TextWindow, WindowConfig, WindowError, WindowSplitter};
