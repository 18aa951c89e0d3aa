//! Live route table handle.
//!
//! Readers take one snapshot per request and keep it for the whole request,
//! so a concurrent swap never changes the table under an in-flight request.
//! The watcher is the only writer.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::routing::table::RouteTable;

/// Atomically swappable reference to the active [`RouteTable`].
#[derive(Debug, Clone)]
pub struct RouteStore {
    inner: Arc<ArcSwap<RouteTable>>,
}

impl RouteStore {
    pub fn new(table: RouteTable) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(table)),
        }
    }

    /// Current table. Lock-free; never observes a partial table.
    pub fn snapshot(&self) -> Arc<RouteTable> {
        self.inner.load_full()
    }

    /// Publish `table` as the active set and return the one it replaced.
    pub fn replace(&self, table: RouteTable) -> Arc<RouteTable> {
        self.inner.swap(Arc::new(table))
    }
}

impl Default for RouteStore {
    fn default() -> Self {
        Self::new(RouteTable::default())
    }
}
