//! Index inspection.
//!
//! Derives the `source_id → entry ids` view of the persisted index that
//! reconciliation plans and deletions are computed from. A fresh index
//! with zero entries yields an empty map.

use crate::error::SyncError;
use crate::index::{EntryId, VectorIndex};
use std::collections::BTreeMap;

/// Map every indexed source to its entry ids, in listing order.
pub async fn source_map(
    index: &dyn VectorIndex,
) -> Result<BTreeMap<String, Vec<EntryId>>, SyncError> {
    let heads = index.list_all().await.map_err(SyncError::Inspect)?;

    let mut map: BTreeMap<String, Vec<EntryId>> = BTreeMap::new();
    for head in heads {
        map.entry(head.source_id).or_default().push(head.id);
    }
    Ok(map)
}
