//! In-memory store.

use super::{Store, StoreError, WriteBatch, WriteOp};
use std::collections::BTreeMap;

/// Reference [`Store`] backed by ordinary maps.
///
/// Used by the test suites and the workload generator. All operations are
/// infallible in practice; the error paths exist to exercise the adapter
/// contract real backends implement.
#[derive(Clone, Debug, Default)]
pub struct MemStore {
    values: BTreeMap<String, Vec<u8>>,
    counters: BTreeMap<String, u64>,
}

impl MemStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn key_count(&self) -> usize {
        self.values.len()
    }
}

impl Store for MemStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.values.contains_key(key))
    }

    fn append(&mut self, key: &str, entry: &[u8]) -> Result<(), StoreError> {
        self.values
            .entry(key.to_string())
            .or_default()
            .extend_from_slice(entry);
        Ok(())
    }

    fn list_len(&self, key: &str, entry_size: usize) -> Result<u64, StoreError> {
        let Some(value) = self.values.get(key) else {
            return Ok(0);
        };
        if value.len() % entry_size != 0 {
            return Err(StoreError::Corrupt(format!(
                "list {key} holds {} bytes, not a multiple of {entry_size}",
                value.len()
            )));
        }
        Ok((value.len() / entry_size) as u64)
    }

    fn list_range(
        &self,
        key: &str,
        entry_size: usize,
        start: u64,
        count: u64,
    ) -> Result<Vec<u8>, StoreError> {
        let len = self.list_len(key, entry_size)?;
        if start >= len {
            return Ok(Vec::new());
        }
        let end = len.min(start.saturating_add(count));
        let value = &self.values[key];
        Ok(value[start as usize * entry_size..end as usize * entry_size].to_vec())
    }

    fn counter_next(&mut self, name: &str) -> Result<u64, StoreError> {
        let counter = self.counters.entry(name.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<(), StoreError> {
        for op in batch.into_ops() {
            match op {
                WriteOp::Put { key, value } => {
                    self.values.insert(key, value);
                }
                WriteOp::Append { key, entry } => {
                    self.values.entry(key).or_default().extend_from_slice(&entry);
                }
            }
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.values.clear();
        self.counters.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_exists() {
        let mut store = MemStore::new();
        assert_eq!(store.get("a").unwrap(), None);
        assert!(!store.exists("a").unwrap());

        store.put("a", &[1, 2, 3]).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(vec![1, 2, 3]));
        assert!(store.exists("a").unwrap());

        store.put("a", &[4]).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(vec![4]));
    }

    #[test]
    fn test_list_append_len_range() {
        let mut store = MemStore::new();
        assert_eq!(store.list_len("l", 4).unwrap(), 0);
        assert!(store.list_range("l", 4, 0, 10).unwrap().is_empty());

        for i in 0u32..5 {
            store.append("l", &i.to_le_bytes()).unwrap();
        }
        assert_eq!(store.list_len("l", 4).unwrap(), 5);

        let window = store.list_range("l", 4, 1, 2).unwrap();
        assert_eq!(window.len(), 8);
        assert_eq!(u32::from_le_bytes(window[0..4].try_into().unwrap()), 1);
        assert_eq!(u32::from_le_bytes(window[4..8].try_into().unwrap()), 2);

        // Clamped at the end, empty past the end.
        assert_eq!(store.list_range("l", 4, 3, 100).unwrap().len(), 8);
        assert!(store.list_range("l", 4, 5, 1).unwrap().is_empty());
    }

    #[test]
    fn test_list_len_rejects_ragged_value() {
        let mut store = MemStore::new();
        store.put("l", &[0u8; 10]).unwrap();
        assert!(matches!(
            store.list_len("l", 4),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_counter_starts_at_one_and_increases() {
        let mut store = MemStore::new();
        assert_eq!(store.counter_next("ts").unwrap(), 1);
        assert_eq!(store.counter_next("ts").unwrap(), 2);
        assert_eq!(store.counter_next("other").unwrap(), 1);
        assert_eq!(store.counter_next("ts").unwrap(), 3);
    }

    #[test]
    fn test_commit_applies_in_order() {
        let mut store = MemStore::new();
        let mut batch = WriteBatch::new();
        batch.put("k".into(), vec![1]);
        batch.append("l".into(), vec![2, 2]);
        batch.append("l".into(), vec![3, 3]);
        batch.put("k".into(), vec![9]);
        store.commit(batch).unwrap();

        assert_eq!(store.get("k").unwrap(), Some(vec![9]));
        assert_eq!(store.get("l").unwrap(), Some(vec![2, 2, 3, 3]));
    }

    #[test]
    fn test_clear() {
        let mut store = MemStore::new();
        store.put("a", &[1]).unwrap();
        store.counter_next("ts").unwrap();
        store.clear().unwrap();
        assert_eq!(store.key_count(), 0);
        assert_eq!(store.counter_next("ts").unwrap(), 1);
    }
}
