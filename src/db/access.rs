//! Access and refresh tokens.
//!
//! A saved access record occupies three keys:
//!
//! ```text
//! access:<access_id>          -> encoded record
//! access_token:<access token> -> access_id
//! refresh_token:<refresh tok> -> access_id   (only with a refresh token)
//! ```
//!
//! Either token resolves to the same record, and revoking through either
//! token deletes all three keys. A token may be re-saved into a newer record;
//! its pointer then belongs to that record, so removal only deletes pointers
//! that still hold the removed `access_id`. The writes of a save and the
//! deletes of a removal are each applied as one atomic batch.

use super::codec::{self, StoredAccess};
use super::{Engine, Namespace, TokenStore, Write};
use crate::core::models::AccessData;
use crate::core::types::{AccessId, AccessToken, RefreshToken};
use crate::error::{CodecError, Error, Result, ResultExt};
use crate::util::random::FromRandom;

impl<E: Engine> TokenStore<E> {
    /// Saves an access record under a fresh access id and links both tokens
    /// to it. Saving never updates an existing record in place.
    pub fn save_access(&self, data: &AccessData) -> Result<AccessId> {
        let token_key = self.key(Namespace::AccessToken, &data.access_token.0);

        if data.access_token.is_empty() {
            return Err(Error::Encode {
                context: format!("access for {}", token_key),
                source: CodecError::EmptyToken,
            });
        }

        let payload =
            codec::encode(StoredAccess::from(data)).map_err(|source| Error::Encode {
                context: format!("access for {}", token_key),
                source,
            })?;

        let access_id = AccessId::from_random();
        let access_key = self.key(Namespace::Access, &access_id.0);

        let mut batch = vec![
            Write::Set {
                key: access_key.clone(),
                value: payload,
            },
            Write::Set {
                key: token_key,
                value: access_id.0.clone().into_bytes(),
            },
        ];
        if let Some(refresh) = data.refresh_token() {
            batch.push(Write::Set {
                key: self.key(Namespace::RefreshToken, &refresh.0),
                value: access_id.0.clone().into_bytes(),
            });
        }

        self.engine
            .apply(&batch)
            .backend_context(|| format!("save access {}", access_key))?;

        tracing::debug!(
            %access_id,
            client_id = %data.client.id,
            refresh = data.refresh_token().is_some(),
            "saved access"
        );
        Ok(access_id)
    }

    pub fn load_by_access_token(&self, token: &AccessToken) -> Result<AccessData> {
        self.load_access(Namespace::AccessToken, &token.0)
    }

    pub fn load_by_refresh_token(&self, token: &RefreshToken) -> Result<AccessData> {
        self.load_access(Namespace::RefreshToken, &token.0)
    }

    /// Revokes the access record reachable through `token`, including the
    /// pointer of its refresh token.
    pub fn remove_by_access_token(&self, token: &AccessToken) -> Result<()> {
        self.remove_access(Namespace::AccessToken, &token.0)
    }

    /// Revokes the access record reachable through `token`, including the
    /// pointer of its access token.
    pub fn remove_by_refresh_token(&self, token: &RefreshToken) -> Result<()> {
        self.remove_access(Namespace::RefreshToken, &token.0)
    }

    fn resolve(&self, pointer_key: &str) -> Result<AccessId> {
        let raw = self.fetch("resolve", pointer_key)?;
        codec::decode_pointer(raw)
            .map(AccessId)
            .map_err(|source| Error::Decode {
                context: format!("pointer {}", pointer_key),
                source,
            })
    }

    fn decode_access(&self, access_key: &str, payload: &[u8]) -> Result<StoredAccess> {
        codec::decode(payload).map_err(|source| Error::Decode {
            context: format!("access {}", access_key),
            source,
        })
    }

    fn load_access(&self, namespace: Namespace, token: &str) -> Result<AccessData> {
        let pointer_key = self.key(namespace, token);
        let access_id = self.resolve(&pointer_key)?;
        let access_key = self.key(Namespace::Access, &access_id.0);

        let payload = self.fetch("load access", &access_key).map_err(|e| {
            if e.is_not_found() {
                tracing::warn!(%access_id, %namespace, "token points at a missing access record");
            }
            e
        })?;

        let stored = self.decode_access(&access_key, &payload)?;
        self.hydrate_access(stored)
    }

    /// Replaces stored client ids with the clients currently registered.
    fn hydrate_access(&self, mut stored: StoredAccess) -> Result<AccessData> {
        let client = self.get_client(&stored.client_id)?;

        let authorize = match stored.authorize.take() {
            Some(authorize) => {
                let client = self.get_client(&authorize.client_id)?;
                Some(authorize.hydrate(client))
            }
            None => None,
        };

        Ok(stored.hydrate(client, authorize))
    }

    fn remove_access(&self, namespace: Namespace, token: &str) -> Result<()> {
        let pointer_key = self.key(namespace, token);
        let access_id = self.resolve(&pointer_key)?;
        let access_key = self.key(Namespace::Access, &access_id.0);

        // The record names both tokens; the pointer only names one of them.
        let stored = self
            .engine
            .get(&access_key)
            .backend_context(|| format!("load access {}", access_key))?
            .map(|payload| self.decode_access(&access_key, &payload))
            .transpose()?;

        let owned = |key: String| Write::DelIfEq {
            key,
            expected: access_id.0.clone().into_bytes(),
        };

        let mut batch = vec![
            Write::Del {
                key: access_key.clone(),
            },
            owned(pointer_key),
        ];

        match &stored {
            Some(stored) => {
                batch.push(owned(
                    self.key(Namespace::AccessToken, &stored.access_token.0),
                ));
                if let Some(refresh) = stored.refresh_token() {
                    batch.push(owned(self.key(Namespace::RefreshToken, &refresh.0)));
                }
            }
            None => {
                tracing::warn!(%access_id, %namespace, "removing dangling token pointer");
            }
        }

        self.engine
            .apply(&batch)
            .backend_context(|| format!("delete access {}", access_key))?;

        tracing::debug!(%access_id, via = %namespace, "removed access");
        Ok(())
    }
}
