//! Directory scanning.
//!
//! Produces the set of source identifiers for all eligible files directly
//! under a root directory. Eligibility is a single recognized extension,
//! matched case-insensitively; there is no recursion into subdirectories.
//! Source identifiers are normalized absolute paths, so the same file
//! always yields the same identifier regardless of how the root was
//! spelled.

use crate::error::SyncError;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

fn scan_error(root: &Path, message: impl std::fmt::Display) -> SyncError {
    SyncError::Scan {
        root: root.to_path_buf(),
        message: message.to_string(),
    }
}

/// Scan `root` for files with the given extension (without the dot).
///
/// A missing root or a root that is not a directory is a [`SyncError::Scan`];
/// an empty directory yields an empty set.
pub async fn scan_sources(root: &Path, extension: &str) -> Result<BTreeSet<String>, SyncError> {
    let root = tokio::fs::canonicalize(root)
        .await
        .map_err(|e| scan_error(root, e))?;

    let metadata = tokio::fs::metadata(&root)
        .await
        .map_err(|e| scan_error(&root, e))?;
    if !metadata.is_dir() {
        return Err(scan_error(&root, "not a directory"));
    }

    let mut sources = BTreeSet::new();
    let mut read_dir = tokio::fs::read_dir(&root)
        .await
        .map_err(|e| scan_error(&root, e))?;

    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| scan_error(&root, e))?
    {
        let path = entry.path();
        let file_type = match entry.file_type().await {
            Ok(ft) => ft,
            Err(e) => {
                warn!("Failed to stat {}: {}", path.display(), e);
                continue;
            }
        };
        if !file_type.is_file() {
            continue;
        }

        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches {
            sources.insert(path.to_string_lossy().to_string());
        }
    }

    debug!(
        "Scanned {}: {} {} source(s)",
        root.display(),
        sources.len(),
        extension
    );
    Ok(sources)
}
