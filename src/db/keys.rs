use std::fmt;

const DELIMITER: char = ':';

/// Record families sharing one key-space.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Namespace {
    Client,
    Authorize,
    Access,
    AccessToken,
    RefreshToken,
}

impl Namespace {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Authorize => "auth",
            Self::Access => "access",
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Maps `(namespace, id)` pairs onto fully-qualified engine keys.
///
/// Tags never contain the delimiter and no tag is a prefix of another tag
/// followed by the delimiter, so for a fixed prefix distinct pairs always
/// produce distinct keys.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn make_key(&self, namespace: Namespace, id: &str) -> String {
        let tag = namespace.tag();
        let mut key = String::with_capacity(self.prefix.len() + tag.len() + id.len() + 2);
        if !self.prefix.is_empty() {
            key.push_str(&self.prefix);
            key.push(DELIMITER);
        }
        key.push_str(tag);
        key.push(DELIMITER);
        key.push_str(id);
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ALL: [Namespace; 5] = [
        Namespace::Client,
        Namespace::Authorize,
        Namespace::Access,
        Namespace::AccessToken,
        Namespace::RefreshToken,
    ];

    #[test]
    fn keys_carry_prefix_and_tag() {
        let keys = KeySpace::new("osin");
        assert_eq!(keys.make_key(Namespace::Client, "c1"), "osin:client:c1");
        assert_eq!(keys.make_key(Namespace::Authorize, "xyz"), "osin:auth:xyz");
        assert_eq!(
            keys.make_key(Namespace::RefreshToken, "rt"),
            "osin:refresh_token:rt"
        );
    }

    #[test]
    fn empty_prefix_is_omitted() {
        let keys = KeySpace::new("");
        assert_eq!(keys.make_key(Namespace::Access, "id"), "access:id");
    }

    #[test]
    fn distinct_pairs_never_collide() {
        let keys = KeySpace::new("p");
        let ids = ["", "a", "token:a", "_token:a", ":", "access", "client:c"];

        let mut seen = HashSet::new();
        for ns in ALL.iter() {
            for id in ids.iter() {
                assert!(
                    seen.insert(keys.make_key(*ns, id)),
                    "collision for {}:{}",
                    ns,
                    id
                );
            }
        }
    }
}
