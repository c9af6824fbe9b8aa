use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a registered user; unique key in the stream registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Destination room for published batches and notices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RoomId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Credential used to authenticate remote fetches on behalf of one stream.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Identity attached to anything the bridge emits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SenderIdentity {
    /// A bridge subsystem (poller, scheduler, ...).
    System { name: String },
    /// Emitted on behalf of a specific user stream.
    User { user_id: UserId },
}

impl SenderIdentity {
    pub fn system(name: impl Into<String>) -> Self {
        Self::System { name: name.into() }
    }

    /// Flat tag used as an event `source`.
    pub fn tag(&self) -> String {
        match self {
            Self::System { name } => name.clone(),
            Self::User { user_id } => format!("user:{user_id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_token_debug_is_redacted() {
        let token = AuthToken::new("ghp_secret");
        assert_eq!(format!("{token:?}"), "AuthToken(<redacted>)");
        assert_eq!(token.expose(), "ghp_secret");
    }

    #[test]
    fn sender_tags() {
        assert_eq!(SenderIdentity::system("notifications:github").tag(), "notifications:github");
        let user = SenderIdentity::User {
            user_id: UserId::from("@alice:example.org"),
        };
        assert_eq!(user.tag(), "user:@alice:example.org");
    }
}
