//! Failures surfaced at the persistence boundary.
//!
//! Every [`Error`] carries the operation and key that produced it. Nothing
//! here is retried or replaced with a default; callers decide how a missing
//! key or a backend failure maps onto a protocol response.

use std::string::FromUtf8Error;
use std::time::Duration;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to encode {context}")]
    Encode {
        context: String,
        #[source]
        source: CodecError,
    },

    #[error("failed to decode {context}")]
    Decode {
        context: String,
        #[source]
        source: CodecError,
    },

    /// The key is absent: never written, removed, or its TTL elapsed.
    #[error("{context}: not found or expired")]
    NotFound { context: String },

    #[error("{context}: backend failure")]
    Backend {
        context: String,
        #[source]
        source: BackendError,
    },

    #[error("{context}: expiry of {expires_in} seconds is out of range")]
    InvalidExpiry { context: String, expires_in: u64 },
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    pub(crate) fn not_found(context: impl Into<String>) -> Self {
        Self::NotFound {
            context: context.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("expected a {expected} record, found a {found} record")]
    UnexpectedShape {
        expected: &'static str,
        found: &'static str,
    },

    #[error("unsupported record version {0}")]
    UnsupportedVersion(u16),

    #[error("token pointer is not valid utf-8")]
    InvalidPointer(#[from] FromUtf8Error),

    #[error("access token must not be empty")]
    EmptyToken,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("connection pool: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("{0:?} past now is beyond the engine clock")]
    ClockOverflow(Duration),
}

pub(crate) trait ResultExt<T> {
    fn backend_context(self, context: impl FnOnce() -> String) -> Result<T>;
}

impl<T> ResultExt<T> for std::result::Result<T, BackendError> {
    fn backend_context(self, context: impl FnOnce() -> String) -> Result<T> {
        self.map_err(|source| Error::Backend {
            context: context(),
            source,
        })
    }
}
