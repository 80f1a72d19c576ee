use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Returned for row numbers that are not (yet) covered by the cache.
pub const NULL_ROW_NUMBER: &str = "null";

/// Cache shared between all table views created with the same handle.
pub type SharedRowIndex = Arc<Mutex<RowIndexCache>>;

/// Display strings for row numbers.
///
/// The cache only ever grows. Growing allocates exactly the requested number
/// of entries, copies the strings that already exist and formats only the new
/// indices, so no row number is formatted twice.
#[derive(Debug, Default)]
pub struct RowIndexCache {
    rows: Vec<Arc<str>>,
    grow_count: usize,
}

impl RowIndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedRowIndex {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn ensure_capacity(&mut self, nrows: usize) {
        if self.rows.len() >= nrows {
            return;
        }
        let mut rows: Vec<Arc<str>> = Vec::with_capacity(nrows);
        rows.extend(self.rows.iter().cloned());
        rows.extend((self.rows.len()..nrows).map(|idx| Arc::from(idx.to_string())));
        debug!("Row index cache grown {} -> {}", self.rows.len(), nrows);
        self.rows = rows;
        self.grow_count += 1;
    }

    /// Display string for `row`, or [`NULL_ROW_NUMBER`] when out of range.
    pub fn get(&self, row: usize) -> Arc<str> {
        match self.rows.get(row) {
            Some(s) => s.clone(),
            None => Arc::from(NULL_ROW_NUMBER),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of grow-and-copy operations performed so far.
    pub fn grow_count(&self) -> usize {
        self.grow_count
    }
}

// The cache holds no invariant that a panicking writer could break halfway,
// so a poisoned lock is still safe to use.
pub(crate) fn lock(index: &SharedRowIndex) -> MutexGuard<'_, RowIndexCache> {
    index.lock().unwrap_or_else(|e| e.into_inner())
}
