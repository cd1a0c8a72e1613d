//! Settings exposed by the host's plugin configuration page.

use {
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Public plugin settings.
///
/// Missing fields default to empty strings. Empty names are not rejected
/// here; [`crate::validate`] only warns about them and reconciliation will
/// try to resolve whatever value it is given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    /// Username of the only account allowed to post in read-only channels.
    /// Created automatically if it does not exist.
    #[serde(alias = "Username", alias = "username")]
    pub identity_name: String,

    /// Name of the read-only channel looked up in every team.
    #[serde(alias = "ChannelName")]
    pub channel_name: String,

    /// Text style of messages posted by the read-only user.
    #[serde(alias = "TextStyle")]
    pub text_style: String,
}

impl PluginSettings {
    /// Canonical top-level keys.
    pub const KEYS: &'static [&'static str] = &["identity_name", "channel_name", "text_style"];

    /// Spellings accepted in addition to [`Self::KEYS`], as written by the
    /// host's configuration system.
    pub const ALIASES: &'static [&'static str] =
        &["Username", "username", "ChannelName", "TextStyle"];

    pub fn new(
        identity_name: impl Into<String>,
        channel_name: impl Into<String>,
        text_style: impl Into<String>,
    ) -> Self {
        Self {
            identity_name: identity_name.into(),
            channel_name: channel_name.into(),
            text_style: text_style.into(),
        }
    }

    /// Returns `true` if `key` is a canonical key or an accepted alias.
    #[must_use]
    pub fn is_known_key(key: &str) -> bool {
        Self::KEYS.contains(&key) || Self::ALIASES.contains(&key)
    }
}

/// The user-facing settings tracked for change auditing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingField {
    #[serde(rename = "username")]
    IdentityName,
    ChannelName,
    TextStyle,
}

impl SettingField {
    pub const ALL: &'static [SettingField] =
        &[Self::IdentityName, Self::ChannelName, Self::TextStyle];

    /// Key used in audit records.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::IdentityName => "username",
            Self::ChannelName => "channel_name",
            Self::TextStyle => "text_style",
        }
    }
}

impl fmt::Display for SettingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
