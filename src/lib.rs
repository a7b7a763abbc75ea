pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod util;

pub use crate::config::StoreConfig;
pub use crate::db::{Engine, MemoryEngine, RedisEngine, TokenStore};
pub use crate::error::{Error, Result};
