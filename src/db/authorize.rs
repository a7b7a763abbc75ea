use super::codec::{self, StoredAuthorize};
use super::{Engine, Namespace, TokenStore};
use crate::core::models::AuthorizeData;
use crate::core::types::AuthCode;
use crate::error::{Error, Result, ResultExt};

/// Longest accepted code lifetime: half of what Redis takes for `SETEX`,
/// leaving room for the current time in its millisecond expiry.
pub const MAX_EXPIRES_IN: u64 = i64::MAX as u64 / 1000 / 2;

impl<E: Engine> TokenStore<E> {
    /// Stores an authorization code. The engine drops it after
    /// `data.expires_in` seconds, which must lie in `1..=MAX_EXPIRES_IN`.
    pub fn save_authorize(&self, data: &AuthorizeData) -> Result<()> {
        let key = self.key(Namespace::Authorize, &data.code.0);

        if data.expires_in == 0 || data.expires_in > MAX_EXPIRES_IN {
            return Err(Error::InvalidExpiry {
                context: format!("save auth {}", key),
                expires_in: data.expires_in,
            });
        }

        let payload =
            codec::encode(StoredAuthorize::from(data)).map_err(|source| Error::Encode {
                context: format!("auth {}", key),
                source,
            })?;

        self.engine
            .set_ex(&key, &payload, data.expires_in)
            .backend_context(|| format!("save auth {}", key))?;

        tracing::debug!(
            client_id = %data.client.id,
            expires_in = data.expires_in,
            "saved authorization code"
        );
        Ok(())
    }

    /// Loads an authorization code together with its current client.
    ///
    /// An expired code is indistinguishable from one never written; both
    /// fail with [`Error::NotFound`].
    pub fn load_authorize(&self, code: &AuthCode) -> Result<AuthorizeData> {
        let key = self.key(Namespace::Authorize, &code.0);
        let payload = self.fetch("load auth", &key)?;

        let stored: StoredAuthorize = codec::decode(&payload).map_err(|source| Error::Decode {
            context: format!("auth {}", key),
            source,
        })?;

        let client = self.get_client(&stored.client_id)?;
        Ok(stored.hydrate(client))
    }

    /// Removing an unknown or expired code succeeds.
    pub fn remove_authorize(&self, code: &AuthCode) -> Result<()> {
        let key = self.key(Namespace::Authorize, &code.0);

        self.engine
            .del(&key)
            .backend_context(|| format!("delete auth {}", key))?;

        tracing::debug!("removed authorization code");
        Ok(())
    }
}
