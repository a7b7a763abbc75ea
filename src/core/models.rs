use std::collections::BTreeMap;

use super::types::*;

/// Caller-defined attributes attached to clients, codes and tokens.
///
/// Floats must be finite; NaN and the infinities have no JSON form and fail
/// to encode.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Extra {
    Null,
    Bool(bool),
    Integer(i64),
    #[serde(serialize_with = "serialize_finite")]
    Float(f64),
    String(String),
    Array(Vec<Extra>),
    Map(BTreeMap<String, Extra>),
}

impl Default for Extra {
    fn default() -> Self {
        Self::Null
    }
}

fn serialize_finite<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    if !value.is_finite() {
        return Err(serde::ser::Error::custom(format!(
            "non-finite float {} in user data",
            value
        )));
    }
    serializer.serialize_f64(*value)
}

impl Extra {
    pub fn map<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Extra)>,
        K: Into<String>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn get(&self, key: &str) -> Option<&Extra> {
        match self {
            Self::Map(m) => m.get(key),
            _ => None,
        }
    }
}

impl From<&str> for Extra {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<i64> for Extra {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<bool> for Extra {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Client {
    pub id: ClientId,
    #[serde(default)]
    pub secret: ClientSecret,
    #[serde(default)]
    pub redirect_uri: RedirectUri,
    #[serde(default)]
    pub user_data: Extra,
}

impl Client {
    pub fn new(id: impl Into<ClientId>) -> Self {
        Self {
            id: id.into(),
            secret: ClientSecret::default(),
            redirect_uri: RedirectUri::default(),
            user_data: Extra::Null,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AuthorizeData {
    pub client: Client,
    pub code: AuthCode,
    /// Lifetime in seconds, also used as the engine TTL.
    pub expires_in: u64,
    pub scope: Scope,
    pub redirect_uri: RedirectUri,
    pub state: Option<String>,
    pub created_at: Timestamp,
    pub user_data: Extra,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
}

impl AuthorizeData {
    pub fn new(client: Client, code: impl Into<AuthCode>, expires_in: u64) -> Self {
        Self {
            redirect_uri: client.redirect_uri.clone(),
            client,
            code: code.into(),
            expires_in,
            scope: Scope::default(),
            state: None,
            created_at: Timestamp::now(),
            user_data: Extra::Null,
            code_challenge: None,
            code_challenge_method: None,
        }
    }
}

impl Expire for AuthorizeData {
    fn created_at(&self) -> Timestamp {
        self.created_at
    }

    fn expires_in(&self) -> u64 {
        self.expires_in
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AccessData {
    pub client: Client,
    pub authorize: Option<AuthorizeData>,
    pub access_token: AccessToken,
    /// `Some` holding an empty token is stored, and loaded back, as `None`.
    pub refresh_token: Option<RefreshToken>,
    pub expires_in: u64,
    pub scope: Scope,
    pub redirect_uri: RedirectUri,
    pub created_at: Timestamp,
    pub user_data: Extra,
}

impl AccessData {
    pub fn new(client: Client, access_token: impl Into<AccessToken>, expires_in: u64) -> Self {
        Self {
            redirect_uri: client.redirect_uri.clone(),
            client,
            authorize: None,
            access_token: access_token.into(),
            refresh_token: None,
            expires_in,
            scope: Scope::default(),
            created_at: Timestamp::now(),
            user_data: Extra::Null,
        }
    }

    pub fn with_refresh_token(mut self, token: impl Into<RefreshToken>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    pub fn with_authorize(mut self, data: AuthorizeData) -> Self {
        self.authorize = Some(data);
        self
    }

    /// The refresh token, unless absent or empty.
    pub fn refresh_token(&self) -> Option<&RefreshToken> {
        self.refresh_token.as_ref().filter(|t| !t.is_empty())
    }
}

impl Expire for AccessData {
    fn created_at(&self) -> Timestamp {
        self.created_at
    }

    fn expires_in(&self) -> u64 {
        self.expires_in
    }
}
