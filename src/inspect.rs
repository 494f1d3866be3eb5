//! Process-wide, read-only view of the most recent index pass for external
//! tooling. Not part of the resolution path.

use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;

use crate::index::IndexSnapshot;

static LATEST: LazyLock<RwLock<Arc<IndexSnapshot>>> =
    LazyLock::new(|| RwLock::new(Arc::new(IndexSnapshot::empty())));

pub(crate) fn publish(snapshot: Arc<IndexSnapshot>) {
    *LATEST.write() = snapshot;
}

/// The last snapshot published by any reindexer in this process.
pub fn latest() -> Arc<IndexSnapshot> {
    Arc::clone(&LATEST.read())
}
