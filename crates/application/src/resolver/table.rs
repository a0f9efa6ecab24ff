use rustc_hash::FxHashMap;

use super::query::PendingQuery;

/// Index of in-flight queries keyed by the case-insensitive hostname hash.
///
/// The hash is not collision-free; every lookup that matches a slot must
/// also compare the stored literal hostname byte-for-byte before acting on
/// the entry.
#[derive(Debug, Default)]
pub(crate) struct QueryTable {
    entries: FxHashMap<u64, PendingQuery>,
}

impl QueryTable {
    pub fn get_mut(&mut self, key: u64) -> Option<&mut PendingQuery> {
        self.entries.get_mut(&key)
    }

    /// Insert a new query. The caller has already established that the slot
    /// is free (or failed the request on a literal mismatch).
    pub fn insert(&mut self, query: PendingQuery) {
        debug_assert!(!self.entries.contains_key(&query.key));
        self.entries.insert(query.key, query);
    }

    pub fn remove(&mut self, key: u64) -> Option<PendingQuery> {
        self.entries.remove(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn drain(&mut self) -> Vec<PendingQuery> {
        self.entries.drain().map(|(_, q)| q).collect()
    }
}
