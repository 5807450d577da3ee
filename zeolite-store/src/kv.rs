use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{PoisonError, RwLock};

/// A string-keyed store holding string values.
///
/// Stores know nothing about availability documents; encoding and decoding
/// happen in [`AvailabilityStore`](crate::AvailabilityStore).
///
/// All methods take `&self` to support stores with internal locking.
pub trait Store {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Retrieves the value stored under `key`, or None if not present.
    fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Stores `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: &str) -> Result<(), Self::Error>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), Self::Error>;
}

impl<S: Store> Store for &S {
    type Error = S::Error;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        (*self).get(key)
    }

    fn put(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        (*self).put(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        (*self).remove(key)
    }
}

/// An in-memory store backed by a HashMap.
///
/// Useful for testing and as a reference implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    type Error = Infallible;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        Ok(data.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.remove(key);
        Ok(())
    }
}
