//! Persistence of clients, authorization codes and access tokens in a
//! remote key-value engine.
//!
//! [`TokenStore`] is generic over the [`Engine`] it talks to. Production
//! deployments use [`RedisEngine`]; [`MemoryEngine`] backs tests and
//! single-process setups.

use std::fmt::Debug;

use crate::config::StoreConfig;
use crate::error::{BackendError, Error, Result, ResultExt};

pub mod codec;
pub mod keys;
pub mod memory;
pub mod redis;

mod access;
mod authorize;
mod client;

pub use self::authorize::MAX_EXPIRES_IN;

pub use self::keys::{KeySpace, Namespace};
pub use self::memory::MemoryEngine;
pub use self::redis::RedisEngine;

/// One write inside an atomic batch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Write {
    Set { key: String, value: Vec<u8> },
    SetEx { key: String, value: Vec<u8>, ttl_secs: u64 },
    Del { key: String },
    /// Deletes `key` only while it still holds `expected`.
    DelIfEq { key: String, expected: Vec<u8> },
}

/// The single-key capabilities the store needs from a key-value engine,
/// plus an atomic batch for the multi-key writes of the access registry.
///
/// Deleting a missing key succeeds. Absent and expired keys read as `None`.
pub trait Engine: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError>;
    fn set(&self, key: &str, value: &[u8]) -> Result<(), BackendError>;
    fn set_ex(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), BackendError>;
    fn del(&self, key: &str) -> Result<(), BackendError>;

    /// Applies every write or none of them.
    fn apply(&self, batch: &[Write]) -> Result<(), BackendError>;
}

#[derive(Clone)]
pub struct TokenStore<E = RedisEngine> {
    engine: E,
    keys: KeySpace,
}

impl TokenStore<RedisEngine> {
    pub fn from_config(config: &StoreConfig) -> Result<Self, BackendError> {
        let engine = RedisEngine::connect(config)?;
        Ok(Self::new(engine, config.key_prefix.clone()))
    }
}

impl<E: Engine> TokenStore<E> {
    pub fn new(engine: E, key_prefix: impl Into<String>) -> Self {
        Self {
            engine,
            keys: KeySpace::new(key_prefix),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn key_space(&self) -> &KeySpace {
        &self.keys
    }

    /// Releases the engine and its connections. Clones made earlier keep
    /// their own handle to the pool.
    pub fn close(self) {
        tracing::debug!(prefix = self.keys.prefix(), "closing token store");
        drop(self.engine);
    }

    fn key(&self, namespace: Namespace, id: &str) -> String {
        self.keys.make_key(namespace, id)
    }

    /// Reads a key that must be present.
    fn fetch(&self, op: &str, key: &str) -> Result<Vec<u8>> {
        self.engine
            .get(key)
            .backend_context(|| format!("{} {}", op, key))?
            .ok_or_else(|| Error::not_found(format!("{} {}", op, key)))
    }
}

impl<E> Debug for TokenStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("prefix", &self.keys.prefix())
            .finish()
    }
}
