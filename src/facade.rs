//! Property-style access to a [`Storage`].
//!
//! The facade keeps no state: every call forwards to the storage it wraps.
//! On top of the raw JSON API it adds typed reads through serde.

use crate::error::{Error, Result};
use crate::storage::Storage;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Thin forwarding wrapper returned by [`Storage::facade`].
///
/// ```rust
/// use json_storage::{MemoryBackend, Storage};
/// use std::sync::Arc;
///
/// let store = Storage::open(Arc::new(MemoryBackend::new()), "rc.json").unwrap();
/// let props = store.facade();
/// props.set("retries", 3).unwrap();
/// assert_eq!(props.get::<u32>("retries").unwrap(), Some(3));
/// assert!(props.has("retries").unwrap());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Facade<'a> {
    storage: &'a Storage,
}

impl<'a> Facade<'a> {
    pub(crate) fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Read `key` and deserialize it into `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.storage.get(key)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| Error::Deserialize(e.to_string())),
            None => Ok(None),
        }
    }

    /// Read `key` as raw JSON.
    pub fn get_value(&self, key: &str) -> Result<Option<Value>> {
        self.storage.get(key)
    }

    /// Write `key`.
    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        self.storage.set(key, value).map(|_| ())
    }

    /// `true` if `key` holds a value.
    pub fn has(&self, key: &str) -> Result<bool> {
        self.storage.has(key)
    }

    /// Enumerate the namespace's keys.
    pub fn keys(&self) -> Result<Vec<String>> {
        self.storage.keys()
    }

    /// The storage behind this facade.
    pub fn storage(&self) -> &'a Storage {
        self.storage
    }
}
