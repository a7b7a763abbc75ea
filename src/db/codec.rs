//! Record encoding.
//!
//! Every blob written by the store is an [`Envelope`] holding one [`Record`].
//! `Record` is the complete, closed set of shapes the store understands;
//! decoding checks both the envelope version and the record kind, so bytes
//! written for one family are never accepted as another.
//!
//! Embedded clients are stored by id only and resolved against the client
//! registry when a record is loaded.

use serde::{Deserialize, Serialize};

use crate::core::models::{AccessData, AuthorizeData, Client, Extra};
use crate::core::types::{
    AccessToken, AuthCode, ClientId, RedirectUri, RefreshToken, Scope, Timestamp,
};
use crate::error::CodecError;

pub const VERSION: u16 = 1;

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    version: u16,
    record: &'a Record,
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    version: u16,
    record: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Record {
    Client(Client),
    Authorize(StoredAuthorize),
    Access(StoredAccess),
}

impl Record {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Client(_) => "client",
            Self::Authorize(_) => "authorize",
            Self::Access(_) => "access",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredAuthorize {
    pub client_id: ClientId,
    pub code: AuthCode,
    pub expires_in: u64,
    pub scope: Scope,
    pub redirect_uri: RedirectUri,
    #[serde(default)]
    pub state: Option<String>,
    pub created_at: Timestamp,
    #[serde(default)]
    pub user_data: Extra,
    #[serde(default)]
    pub code_challenge: Option<String>,
    #[serde(default)]
    pub code_challenge_method: Option<String>,
}

impl StoredAuthorize {
    pub fn hydrate(self, client: Client) -> AuthorizeData {
        AuthorizeData {
            client,
            code: self.code,
            expires_in: self.expires_in,
            scope: self.scope,
            redirect_uri: self.redirect_uri,
            state: self.state,
            created_at: self.created_at,
            user_data: self.user_data,
            code_challenge: self.code_challenge,
            code_challenge_method: self.code_challenge_method,
        }
    }
}

impl From<&AuthorizeData> for StoredAuthorize {
    fn from(data: &AuthorizeData) -> Self {
        Self {
            client_id: data.client.id.clone(),
            code: data.code.clone(),
            expires_in: data.expires_in,
            scope: data.scope.clone(),
            redirect_uri: data.redirect_uri.clone(),
            state: data.state.clone(),
            created_at: data.created_at,
            user_data: data.user_data.clone(),
            code_challenge: data.code_challenge.clone(),
            code_challenge_method: data.code_challenge_method.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredAccess {
    pub client_id: ClientId,
    #[serde(default)]
    pub authorize: Option<StoredAuthorize>,
    pub access_token: AccessToken,
    #[serde(default)]
    pub refresh_token: Option<RefreshToken>,
    pub expires_in: u64,
    pub scope: Scope,
    pub redirect_uri: RedirectUri,
    pub created_at: Timestamp,
    #[serde(default)]
    pub user_data: Extra,
}

impl StoredAccess {
    /// The refresh token, unless absent or empty.
    pub fn refresh_token(&self) -> Option<&RefreshToken> {
        self.refresh_token.as_ref().filter(|t| !t.is_empty())
    }

    pub fn hydrate(self, client: Client, authorize: Option<AuthorizeData>) -> AccessData {
        AccessData {
            client,
            authorize,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_in: self.expires_in,
            scope: self.scope,
            redirect_uri: self.redirect_uri,
            created_at: self.created_at,
            user_data: self.user_data,
        }
    }
}

impl From<&AccessData> for StoredAccess {
    fn from(data: &AccessData) -> Self {
        Self {
            client_id: data.client.id.clone(),
            authorize: data.authorize.as_ref().map(StoredAuthorize::from),
            access_token: data.access_token.clone(),
            refresh_token: data.refresh_token().cloned(),
            expires_in: data.expires_in,
            scope: data.scope.clone(),
            redirect_uri: data.redirect_uri.clone(),
            created_at: data.created_at,
            user_data: data.user_data.clone(),
        }
    }
}

/// A shape that may be stored as a [`Record`].
pub trait Encodable: Sized {
    const KIND: &'static str;

    fn into_record(self) -> Record;
    fn from_record(record: Record) -> Result<Self, CodecError>;
}

macro_rules! encodable {
    ($ty:ty, $variant:ident, $kind:literal) => {
        impl Encodable for $ty {
            const KIND: &'static str = $kind;

            fn into_record(self) -> Record {
                Record::$variant(self)
            }

            fn from_record(record: Record) -> Result<Self, CodecError> {
                match record {
                    Record::$variant(r) => Ok(r),
                    other => Err(CodecError::UnexpectedShape {
                        expected: Self::KIND,
                        found: other.kind(),
                    }),
                }
            }
        }
    };
}

encodable!(Client, Client, "client");
encodable!(StoredAuthorize, Authorize, "authorize");
encodable!(StoredAccess, Access, "access");

pub fn encode<T: Encodable>(value: T) -> Result<Vec<u8>, CodecError> {
    let record = value.into_record();
    let envelope = Envelope {
        version: VERSION,
        record: &record,
    };
    Ok(serde_json::to_vec(&envelope)?)
}

pub fn decode<T: Encodable>(bytes: &[u8]) -> Result<T, CodecError> {
    let raw: RawEnvelope = serde_json::from_slice(bytes)?;
    if raw.version != VERSION {
        return Err(CodecError::UnsupportedVersion(raw.version));
    }
    let record: Record = serde_json::from_value(raw.record)?;
    T::from_record(record)
}

/// Token pointers hold the bare access id rather than an encoded record.
pub fn decode_pointer(bytes: Vec<u8>) -> Result<String, CodecError> {
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        let mut client = Client::new("c1");
        client.secret = "s3cret".into();
        client.redirect_uri = "https://example.com/cb".into();
        client.user_data = Extra::map(vec![
            ("tier", Extra::from("gold")),
            ("quota", Extra::from(10i64)),
            ("ratio", Extra::Float(0.5)),
            ("flags", Extra::Array(vec![Extra::from(true), Extra::Null])),
        ]);
        client
    }

    #[test]
    fn client_keeps_every_field() {
        let original = client();
        let bytes = encode(original.clone()).unwrap();
        let back: Client = decode(&bytes).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn embedded_clients_are_stored_by_id() {
        let authorize = AuthorizeData::new(client(), "code", 60);
        let access = AccessData::new(client(), "at", 3600).with_authorize(authorize);

        let bytes = encode(StoredAccess::from(&access)).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("s3cret"));
        assert!(text.contains("\"client_id\":\"c1\""));
    }

    #[test]
    fn wrong_record_kind_is_rejected() {
        let bytes = encode(client()).unwrap();
        match decode::<StoredAccess>(&bytes) {
            Err(CodecError::UnexpectedShape { expected, found }) => {
                assert_eq!(expected, "access");
                assert_eq!(found, "client");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn unknown_version_is_rejected() {
        let bytes = br#"{"version":99,"record":{"kind":"client","data":{"id":"c1"}}}"#;
        assert!(matches!(
            decode::<Client>(bytes),
            Err(CodecError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn garbage_is_a_json_error() {
        assert!(matches!(
            decode::<Client>(b"\x00\x01not json"),
            Err(CodecError::Json(_))
        ));
    }

    #[test]
    fn empty_refresh_token_is_not_stored() {
        let access = AccessData::new(client(), "at", 3600).with_refresh_token("");
        let stored = StoredAccess::from(&access);
        assert_eq!(stored.refresh_token, None);
    }
}
