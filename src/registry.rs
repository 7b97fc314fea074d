// Sequential-id registry with one lock per record.
//
// Ids come from an atomic counter; the id → record map is behind an RwLock
// that is only held long enough to clone the record's Arc, so operations on
// different records never wait on each other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// Lock a mutex, recovering the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
pub struct Registry<T> {
    next_id: AtomicU64,
    entries: RwLock<HashMap<u64, Arc<Mutex<T>>>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    pub fn starting_at(next_id: u64) -> Self {
        Self { next_id: AtomicU64::new(next_id), entries: RwLock::new(HashMap::new()) }
    }

    /// Reserve the next id
    pub fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn next_id(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst)
    }

    pub fn insert(&self, id: u64, record: T) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(Mutex::new(record)));
    }

    pub fn get(&self, id: u64) -> Option<Arc<Mutex<T>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).get(&id).cloned()
    }

    /// All ids in ascending order
    pub fn ids(&self) -> Vec<u64> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<u64> = entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> Registry<T> {
    /// Clone of every record, in id order
    pub fn snapshot(&self) -> Vec<T> {
        self.ids()
            .into_iter()
            .filter_map(|id| self.get(id))
            .map(|record| lock(&record).clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_ids_are_sequential() {
        let registry: Registry<&str> = Registry::new();
        assert_eq!(registry.allocate_id(), 0);
        assert_eq!(registry.allocate_id(), 1);
        assert_eq!(registry.next_id(), 2);
    }

    #[test]
    fn test_concurrent_allocation_is_unique() {
        let registry: Arc<Registry<u64>> = Arc::new(Registry::starting_at(10));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || (0..100).map(|_| registry.allocate_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut ids: Vec<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 800);
        assert_eq!(ids[0], 10);
        assert_eq!(ids[799], 809);
    }

    #[test]
    fn test_insert_get_snapshot() {
        let registry = Registry::new();
        registry.insert(2, "b".to_string());
        registry.insert(1, "a".to_string());
        *lock(&registry.get(1).unwrap()) = "aa".to_string();

        assert_eq!(registry.snapshot(), vec!["aa".to_string(), "b".to_string()]);
        assert!(registry.get(3).is_none());
    }
}
