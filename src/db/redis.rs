use std::fmt::Debug;

use r2d2::{Pool, PooledConnection};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task::block_in_place;

use super::{Engine, Write};
use crate::config::StoreConfig;
use crate::error::BackendError;

/// Deletes `KEYS[1]` if it holds `ARGV[1]`. Queued inside `MULTI`, so it runs
/// atomically with the rest of the batch.
const DEL_IF_EQ: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

/// Redis behind an r2d2 connection pool.
///
/// A connection is checked out for each round-trip and returned to the pool
/// when it is dropped, on success and error paths alike. Batches run inside
/// `MULTI`/`EXEC`.
///
/// Calls block the current thread. On a multi-threaded tokio runtime the
/// worker is handed over with `block_in_place`; elsewhere, including a
/// current-thread runtime, the call simply blocks.
#[derive(Clone)]
pub struct RedisEngine {
    pool: Pool<::redis::Client>,
}

impl RedisEngine {
    pub fn connect(config: &StoreConfig) -> Result<Self, BackendError> {
        let client = ::redis::Client::open(config.redis_url.as_str())?;
        let pool = Pool::builder()
            .max_size(config.pool_max_size)
            .connection_timeout(config.connection_timeout)
            .build(client)?;
        tracing::debug!(max_size = config.pool_max_size, "redis pool ready");
        Ok(Self { pool })
    }

    pub fn with_pool(pool: Pool<::redis::Client>) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<PooledConnection<::redis::Client>, BackendError> {
        Ok(self.pool.get()?)
    }

    fn run<T, F>(&self, f: F) -> Result<T, BackendError>
    where
        F: FnOnce(&mut ::redis::Connection) -> ::redis::RedisResult<T>,
    {
        let call = || -> Result<T, BackendError> {
            let mut conn = self.conn()?;
            Ok(f(&mut *conn)?)
        };

        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                block_in_place(call)
            }
            _ => call(),
        }
    }
}

impl Debug for RedisEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.pool.state();
        f.debug_struct("RedisEngine")
            .field("connections", &state.connections)
            .field("idle_connections", &state.idle_connections)
            .finish()
    }
}

impl Engine for RedisEngine {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        self.run(|conn| ::redis::cmd("GET").arg(key).query(conn))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), BackendError> {
        self.run(|conn| ::redis::cmd("SET").arg(key).arg(value).query(conn))
    }

    fn set_ex(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), BackendError> {
        self.run(|conn| {
            ::redis::cmd("SETEX")
                .arg(key)
                .arg(ttl_secs)
                .arg(value)
                .query(conn)
        })
    }

    fn del(&self, key: &str) -> Result<(), BackendError> {
        self.run(|conn| ::redis::cmd("DEL").arg(key).query(conn))
    }

    fn apply(&self, batch: &[Write]) -> Result<(), BackendError> {
        let mut pipe = ::redis::pipe();
        pipe.atomic();
        for write in batch {
            let cmd = match write {
                Write::Set { key, value } => pipe.cmd("SET").arg(key).arg(value.as_slice()),
                Write::SetEx {
                    key,
                    value,
                    ttl_secs,
                } => pipe
                    .cmd("SETEX")
                    .arg(key)
                    .arg(*ttl_secs)
                    .arg(value.as_slice()),
                Write::Del { key } => pipe.cmd("DEL").arg(key),
                Write::DelIfEq { key, expected } => pipe
                    .cmd("EVAL")
                    .arg(DEL_IF_EQ)
                    .arg(1)
                    .arg(key)
                    .arg(expected.as_slice()),
            };
            cmd.ignore();
        }
        self.run(|conn| pipe.query(conn))
    }
}
