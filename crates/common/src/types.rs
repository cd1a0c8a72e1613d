//! Directory entity types.
//!
//! Teams, users and channels are owned by the host's directory; this crate
//! only ever refers to them through the opaque string IDs below.

use {
    serde::{Deserialize, Serialize},
    std::fmt,
};

use crate::error::{Error, Result};

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Parse an ID supplied from outside (CLI flags, fixtures).
            /// Blank input is rejected.
            pub fn parse(raw: &str) -> Result<Self> {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(Error::invalid_id($kind, raw));
                }
                Ok(Self(trimmed.to_string()))
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

opaque_id!(
    /// Team identifier.
    TeamId,
    "team"
);
opaque_id!(
    /// User or bot identifier.
    UserId,
    "user"
);
opaque_id!(
    /// Channel identifier, unique across teams.
    ChannelId,
    "channel"
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
}

/// A user or bot account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub team_id: TeamId,
    pub name: String,
}

/// An inbound message, before it is committed by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub author_id: UserId,
    pub channel_id: ChannelId,
    pub message: String,
}

impl Post {
    pub fn new(
        author_id: impl Into<UserId>,
        channel_id: impl Into<ChannelId>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            author_id: author_id.into(),
            channel_id: channel_id.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_whitespace() {
        assert_eq!(TeamId::parse("  t1 ").unwrap().as_str(), "t1");
    }

    #[test]
    fn parse_rejects_blank() {
        let err = UserId::parse("   ").unwrap_err();
        assert!(matches!(err, Error::InvalidId { kind: "user", .. }));
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&ChannelId::new("c9")).unwrap();
        assert_eq!(json, "\"c9\"");
    }
}
