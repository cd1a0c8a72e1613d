use std::collections::{BTreeSet, HashMap};

use {
    readonly_common::{ChannelId, TeamId, UserId},
    readonly_config::{PluginSettings, SettingField},
    serde::Serialize,
};

/// One fully resolved configuration.
///
/// Published snapshots are shared behind `Arc` and never mutated; a change
/// is made on a clone (`Clone` deep-copies the channel map) and published
/// as a new value. The derived fields are filled in only by the reconciler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub identity_name: String,
    pub channel_name: String,
    pub text_style: String,

    /// Policy switch. The zero-value snapshot is disabled, so nothing is
    /// gated before the first reconciliation.
    pub enabled: bool,

    pub managed_identity_id: Option<UserId>,

    /// The secondary "bot" identity, also allowed to post anywhere.
    pub service_identity_id: Option<UserId>,

    /// Read-only channel per team. Teams without the named channel are
    /// absent.
    pub managed_channel_ids: HashMap<TeamId, ChannelId>,

    /// Teams listed by the reconciliation that produced this snapshot.
    pub known_team_ids: BTreeSet<TeamId>,
}

impl Snapshot {
    /// An unresolved snapshot carrying only the public settings.
    pub fn from_settings(settings: &PluginSettings, enabled: bool) -> Self {
        Self {
            identity_name: settings.identity_name.clone(),
            channel_name: settings.channel_name.clone(),
            text_style: settings.text_style.clone(),
            enabled,
            ..Self::default()
        }
    }

    /// `true` for the never-configured zero value.
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub fn settings(&self) -> PluginSettings {
        PluginSettings::new(&self.identity_name, &self.channel_name, &self.text_style)
    }

    #[must_use]
    pub fn setting(&self, field: SettingField) -> &str {
        match field {
            SettingField::IdentityName => &self.identity_name,
            SettingField::ChannelName => &self.channel_name,
            SettingField::TextStyle => &self.text_style,
        }
    }

    /// Whether `user_id` is one of the identities allowed to post anywhere.
    #[must_use]
    pub fn is_managed_identity(&self, user_id: &UserId) -> bool {
        self.managed_identity_id.as_ref() == Some(user_id)
            || self.service_identity_id.as_ref() == Some(user_id)
    }

    #[must_use]
    pub fn is_managed_channel(&self, channel_id: &ChannelId) -> bool {
        self.managed_channel_ids.values().any(|id| id == channel_id)
    }

    /// The mention text suppressed by the gate, e.g. `@robot`.
    #[must_use]
    pub fn mention(&self) -> String {
        format!("@{}", self.identity_name)
    }

    /// Known teams with no managed channel, in team-ID order.
    #[must_use]
    pub fn teams_missing_channel(&self) -> Vec<TeamId> {
        self.known_team_ids
            .iter()
            .filter(|team_id| !self.managed_channel_ids.contains_key(*team_id))
            .cloned()
            .collect()
    }
}
