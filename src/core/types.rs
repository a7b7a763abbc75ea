use std::{
    collections::HashSet,
    fmt,
    str::FromStr,
    time::{Duration, SystemTime},
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A set of scope names, stored space-joined.
///
/// A part containing a space is split on it when read back.
#[derive(Debug, Clone, Default, Eq)]
pub struct Scope(HashSet<String>);

impl Scope {
    pub fn from_parts(mut parts: Vec<String>) -> Self {
        let set = parts.drain(..).filter(|p| !p.is_empty()).collect();
        Self(set)
    }

    pub fn from_delimited_parts(parts: &str) -> Self {
        let parts = parts
            .split(' ')
            .filter(|p| !p.is_empty())
            .map(ToString::to_string)
            .collect();
        Self(parts)
    }

    pub fn as_joined(&self) -> String {
        let mut parts = self.as_parts();
        parts.sort();
        parts.join(" ")
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.0.contains(scope)
    }

    pub fn as_parts(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let parts = String::deserialize(deserializer)?;
        Ok(Self::from_delimited_parts(&parts))
    }
}

impl Serialize for Scope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let joined = self.as_joined();
        serializer.serialize_str(&joined)
    }
}

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_string()))
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_newtype!(ClientId);
string_newtype!(ClientSecret);
string_newtype!(RedirectUri);
string_newtype!(AuthCode);
string_newtype!(AccessToken);
string_newtype!(RefreshToken);
string_newtype!(
    /// Store-generated identifier shared by both token pointers of one access record.
    AccessId
);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for AccessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Seconds since the unix epoch.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn now() -> Self {
        Self::from(SystemTime::now())
    }

    pub fn as_system_time(self) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(self.0)
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        let secs = time
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_secs();
        Self(secs)
    }
}

pub trait Expire {
    fn created_at(&self) -> Timestamp;
    fn expires_in(&self) -> u64;

    fn expire_at(&self) -> SystemTime {
        let created = self.created_at().as_system_time();
        created
            .checked_add(Duration::from_secs(self.expires_in()))
            .unwrap_or(created)
    }

    fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expire_at() < now
    }

    fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_ignores_order_and_blank_parts() {
        let a = Scope::from_delimited_parts("read  write");
        let b = Scope::from_parts(vec!["write".to_string(), "read".to_string(), String::new()]);
        assert_eq!(a, b);
        assert_eq!(a.as_joined(), "read write");
    }

    #[test]
    fn empty_scope_survives_serialization() {
        let scope = Scope::default();
        let json = serde_json::to_string(&scope).unwrap();
        assert_eq!(json, "\"\"");
        let back: Scope = serde_json::from_str(&json).unwrap();
        assert!(back.is_empty());
    }

    struct Fixed {
        created_at: Timestamp,
        expires_in: u64,
    }

    impl Expire for Fixed {
        fn created_at(&self) -> Timestamp {
            self.created_at
        }
        fn expires_in(&self) -> u64 {
            self.expires_in
        }
    }

    #[test]
    fn expiry_is_relative_to_creation() {
        let item = Fixed {
            created_at: Timestamp(1_000),
            expires_in: 60,
        };
        assert_eq!(item.expire_at(), Timestamp(1_060).as_system_time());
        assert!(!item.is_expired_at(Timestamp(1_060).as_system_time()));
        assert!(item.is_expired_at(Timestamp(1_061).as_system_time()));
    }
}
