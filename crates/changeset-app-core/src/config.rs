// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persisted engine settings.
//!
//! Settings live as one JSON document per key (the engine reads
//! `"changeset"`). [`ConfigStore`] moves the raw bytes; the CLI backs it with
//! the platform config directory and tests with an in-memory map.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Byte storage for settings documents.
pub trait ConfigStore {
    /// Document stored under `key`, or [`ConfigError::NotFound`].
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Replace the document stored under `key`.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Why settings could not be read or written.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Nothing stored under the key.
    #[error("settings key not found")]
    NotFound,
    /// No per-user config directory on this platform.
    #[error("no config directory for this platform")]
    NoConfigDir,
    /// Reading or writing the backing file failed.
    #[error("settings io error: {0}")]
    Io(#[from] std::io::Error),
    /// The stored document is not valid JSON for the requested type.
    #[error("settings are malformed: {0}")]
    Serde(#[from] serde_json::Error),
    /// The store refused the request.
    #[error("settings store unavailable: {0}")]
    Unavailable(String),
}

/// Typed JSON access on top of a [`ConfigStore`].
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S>
where
    S: ConfigStore,
{
    /// Wrap `store`.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Settings stored under `key`. Missing and empty documents read as `None`.
    pub fn load<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: DeserializeOwned,
    {
        match self.store.load_raw(key) {
            Ok(bytes) => {
                if bytes.is_empty() {
                    return Ok(None);
                }
                let value = serde_json::from_slice(&bytes)?;
                Ok(Some(value))
            }
            Err(ConfigError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Load a config value, falling back to `T::default()` when the key is
    /// missing or empty. Parse and I/O failures are still reported.
    pub fn load_or_default<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        Ok(self.load(key)?.unwrap_or_default())
    }

    /// Serialize and persist a config value for `key`.
    pub fn save<T>(&self, key: &str, value: &T) -> Result<(), ConfigError>
    where
        T: Serialize,
    {
        let data = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(key, &data)
    }
}
