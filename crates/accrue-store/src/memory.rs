//! In-memory ordered store.

use std::collections::BTreeMap;

use crate::{KvPair, KvStore, Result};

/// [`KvStore`] backed by a `BTreeMap`. Key order matches the SQLite backend.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KvPair>> {
        Ok(self
            .entries
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_is_none() {
        let store = MemStore::new();
        assert_eq!(store.get(b"missing").expect("get"), None);
    }

    #[test]
    fn test_set_overwrites() {
        let mut store = MemStore::new();
        store.set(b"k", b"one").expect("set");
        store.set(b"k", b"two").expect("set");
        assert_eq!(store.get(b"k").expect("get"), Some(b"two".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete() {
        let mut store = MemStore::new();
        store.set(b"k", b"v").expect("set");
        store.delete(b"k").expect("delete");
        store.delete(b"k").expect("delete missing");
        assert!(!store.has(b"k").expect("has"));
    }

    #[test]
    fn test_scan_prefix_is_contiguous() {
        let mut store = MemStore::new();
        store.set(b"pos/a||1", b"1").expect("set");
        store.set(b"pos/a||2", b"2").expect("set");
        store.set(b"pos/ab||1", b"x").expect("set");
        store.set(b"pos/b||1", b"y").expect("set");

        let hits = store.scan_prefix(b"pos/a||").expect("scan");
        let keys: Vec<_> = hits.iter().map(|(k, _)| k.as_slice()).collect();
        assert_eq!(keys, vec![b"pos/a||1".as_slice(), b"pos/a||2".as_slice()]);
    }
}
