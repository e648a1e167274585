//! Mutex-guarded handle for sharing one index between threads.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::IndexResult;
use crate::vector::index::VectorIndex;
use crate::vector::types::SearchHit;

/// Thread-safe wrapper for [`VectorIndex`].
///
/// Every operation holds the lock for its whole duration, so at most one
/// operation runs against the index at a time.
#[derive(Clone)]
pub struct SharedVectorIndex {
    inner: Arc<Mutex<VectorIndex>>,
}

impl SharedVectorIndex {
    pub fn new(index: VectorIndex) -> Self {
        Self {
            inner: Arc::new(Mutex::new(index)),
        }
    }

    /// Runs `f` with shared access, waiting for the lock.
    pub fn with<R>(&self, f: impl FnOnce(&VectorIndex) -> R) -> R {
        f(&self.inner.lock())
    }

    /// Runs `f` with exclusive access, waiting for the lock.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut VectorIndex) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Searches only if the index is idle.
    ///
    /// Returns `None` when another operation holds the index, so live
    /// callers can skip a frame instead of queueing behind a bulk add.
    #[must_use]
    pub fn try_search(&self, query: &[f32], k: usize) -> Option<IndexResult<Vec<SearchHit>>> {
        self.inner.try_lock().map(|index| index.search(query, k))
    }
}

impl std::fmt::Debug for SharedVectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_lock() {
            Some(index) => write!(f, "SharedVectorIndex {{ index: {index:?} }}"),
            None => write!(f, "SharedVectorIndex {{ <locked> }}"),
        }
    }
}
