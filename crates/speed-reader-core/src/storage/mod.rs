//! Key/value persistence used by the library.
//!
//! Values are JSON strings under flat string keys. [`FileStore`] keeps one
//! file per key on disk; [`MemoryStore`] backs tests and dry runs.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::{ReaderError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn delete(&mut self, key: &str) -> Result<()>;
}

/// Read and decode a JSON value. A missing key is `Ok(None)`.
pub fn get_json<T, K>(store: &K, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
    K: KeyValueStore + ?Sized,
{
    match store.get(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|err| ReaderError::storage(key, err)),
        None => Ok(None),
    }
}

pub fn set_json<T, K>(store: &mut K, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    K: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(value).map_err(|err| ReaderError::storage(key, err))?;
    store.set(key, &raw)
}

/// Quota check shared by both stores: `used` is the current total with the
/// old value for the key already subtracted.
pub(crate) fn check_quota(key: &str, used: u64, incoming: u64, quota: Option<u64>) -> Result<()> {
    match quota {
        Some(limit) if used.saturating_add(incoming) > limit => {
            Err(ReaderError::StorageQuotaExceeded {
                what: key.to_string(),
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Entry {
        index: usize,
    }

    #[test]
    fn json_helpers_round_trip_through_a_store() {
        let mut store = MemoryStore::default();
        assert_eq!(get_json::<Entry, _>(&store, "entry").unwrap(), None);
        set_json(&mut store, "entry", &Entry { index: 7 }).unwrap();
        assert_eq!(
            get_json::<Entry, _>(&store, "entry").unwrap(),
            Some(Entry { index: 7 })
        );
    }

    #[test]
    fn corrupt_json_is_a_storage_error() {
        let mut store = MemoryStore::default();
        store.set("entry", "{not json").unwrap();
        let err = get_json::<Entry, _>(&store, "entry").unwrap_err();
        assert!(err.is_persistence());
    }
}
