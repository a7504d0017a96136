use super::{KeyValueStore, check_quota};
use crate::error::Result;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    quota_bytes: Option<u64>,
}

impl MemoryStore {
    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            entries: HashMap::new(),
            quota_bytes: Some(quota_bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn used_bytes_without(&self, key: &str) -> u64 {
        self.entries
            .iter()
            .filter(|(existing, _)| existing.as_str() != key)
            .map(|(_, value)| value.len() as u64)
            .sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        check_quota(
            key,
            self.used_bytes_without(key),
            value.len() as u64,
            self.quota_bytes,
        )?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReaderError;

    #[test]
    fn quota_counts_replacement_not_addition() {
        let mut store = MemoryStore::with_quota(10);
        store.set("a", "12345678").unwrap();
        store.set("a", "1234567890").unwrap();
        let err = store.set("b", "x").unwrap_err();
        assert!(matches!(err, ReaderError::StorageQuotaExceeded { .. }));
        assert_eq!(store.get("b").unwrap(), None);
    }

    #[test]
    fn delete_of_missing_key_is_fine() {
        let mut store = MemoryStore::default();
        store.delete("nothing").unwrap();
        assert!(store.is_empty());
    }
}
