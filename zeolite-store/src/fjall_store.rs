//! Fjall-backed string store.

use std::path::Path;
use std::string::FromUtf8Error;

use fjall::{Database, Keyspace, KeyspaceCreateOptions};
use thiserror::Error;

use crate::kv::Store;

pub const DEFAULT_KEYSPACE: &str = "zeolite";

#[derive(Debug, Error)]
pub enum FjallError {
    #[error("Fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    #[error("stored value is not UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

/// A persistent store backed by Fjall.
pub struct FjallStore {
    keyspace: Keyspace,
    _database: Database, // Keep keyspace alive
}

impl FjallStore {
    /// Opens a Fjall store at the given path using the default keyspace.
    ///
    /// Creates the database if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FjallError> {
        Self::open_keyspace(path, DEFAULT_KEYSPACE)
    }

    /// Opens a Fjall store at the given path with a specific keyspace name.
    pub fn open_keyspace(path: impl AsRef<Path>, keyspace: &str) -> Result<Self, FjallError> {
        let database = Database::builder(path).open()?;
        let keyspace = database.keyspace(keyspace, || KeyspaceCreateOptions::default())?;
        Ok(Self {
            keyspace,
            _database: database,
        })
    }
}

impl Store for FjallStore {
    type Error = FjallError;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        match self.keyspace.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(String::from_utf8(bytes.to_vec())?)),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.keyspace.insert(key.as_bytes(), value.as_bytes())?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        self.keyspace.remove(key.as_bytes())?;
        Ok(())
    }
}
