use super::codec;
use super::{Engine, Namespace, TokenStore};
use crate::core::models::Client;
use crate::core::types::ClientId;
use crate::error::{Error, Result, ResultExt};

impl<E: Engine> TokenStore<E> {
    /// Stores a client, replacing any record already held under its id.
    pub fn create_client(&self, client: &Client) -> Result<()> {
        let key = self.key(Namespace::Client, &client.id.0);

        let payload = codec::encode(client.clone()).map_err(|source| Error::Encode {
            context: format!("client {}", key),
            source,
        })?;

        self.engine
            .set(&key, &payload)
            .backend_context(|| format!("save client {}", key))?;

        tracing::debug!(client_id = %client.id, "saved client");
        Ok(())
    }

    pub fn get_client(&self, id: &ClientId) -> Result<Client> {
        let key = self.key(Namespace::Client, &id.0);
        let payload = self.fetch("get client", &key)?;

        codec::decode(&payload).map_err(|source| Error::Decode {
            context: format!("client {}", key),
            source,
        })
    }

    pub fn update_client(&self, client: &Client) -> Result<()> {
        self.create_client(client)
    }

    /// Deleting an unknown client succeeds.
    pub fn delete_client(&self, client: &Client) -> Result<()> {
        self.delete_client_by_id(&client.id)
    }

    pub fn delete_client_by_id(&self, id: &ClientId) -> Result<()> {
        let key = self.key(Namespace::Client, &id.0);

        self.engine
            .del(&key)
            .backend_context(|| format!("delete client {}", key))?;

        tracing::debug!(client_id = %id, "deleted client");
        Ok(())
    }
}
