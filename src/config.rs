use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_KEY_PREFIX: &str = "osin";
pub const DEFAULT_POOL_SIZE: u32 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Supply {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct StoreConfig {
    pub redis_url: String,
    /// Keeps several logical stores apart inside one engine.
    pub key_prefix: String,
    pub pool_max_size: u32,
    pub connection_timeout: Duration,
}

impl StoreConfig {
    pub fn new(redis_url: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            pool_max_size: DEFAULT_POOL_SIZE,
            connection_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Reads the configuration from the environment, after loading a `.env`
    /// file if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let redis_url = lookup("REDIS_URL").ok_or(ConfigError::Missing("REDIS_URL"))?;

        let key_prefix =
            lookup("TOKEN_STORE_KEY_PREFIX").unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string());
        let pool_max_size = parse_or(&lookup, "TOKEN_STORE_POOL_SIZE", DEFAULT_POOL_SIZE)?;
        let timeout_secs = parse_or(
            &lookup,
            "TOKEN_STORE_CONNECT_TIMEOUT_SECS",
            DEFAULT_CONNECT_TIMEOUT_SECS,
        )?;

        if pool_max_size == 0 {
            return Err(ConfigError::Invalid {
                var: "TOKEN_STORE_POOL_SIZE",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            redis_url,
            key_prefix,
            pool_max_size,
            connection_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
        let map: HashMap<&'static str, String> =
            pairs.iter().map(|(k, v)| (*k, v.to_string())).collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_apply_when_only_url_is_set() {
        let config = StoreConfig::from_lookup(lookup(&[("REDIS_URL", "redis://localhost")])).unwrap();
        assert_eq!(config, StoreConfig::new("redis://localhost"));
    }

    #[test]
    fn overrides_are_read() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("REDIS_URL", "redis://cache:6379/2"),
            ("TOKEN_STORE_KEY_PREFIX", "tenant-a"),
            ("TOKEN_STORE_POOL_SIZE", "4"),
            ("TOKEN_STORE_CONNECT_TIMEOUT_SECS", " 5 "),
        ]))
        .unwrap();
        assert_eq!(config.key_prefix, "tenant-a");
        assert_eq!(config.pool_max_size, 4);
        assert_eq!(config.connection_timeout, Duration::from_secs(5));
    }

    #[test]
    fn missing_url_is_reported() {
        let err = StoreConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("REDIS_URL")));
    }

    #[test]
    fn bad_numbers_are_reported() {
        let err = StoreConfig::from_lookup(lookup(&[
            ("REDIS_URL", "redis://localhost"),
            ("TOKEN_STORE_POOL_SIZE", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "TOKEN_STORE_POOL_SIZE",
                ..
            }
        ));
    }
}
