use std::collections::BTreeMap;

use {
    readonly_common::TeamId,
    readonly_config::SettingField,
    serde::Serialize,
    tracing::warn,
};

use crate::snapshot::Snapshot;

/// User-facing settings that differ between two snapshots.
///
/// Each entry carries the *new* value of its own field. Derived identifiers
/// and `enabled` are not compared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigDiff {
    pub changes: BTreeMap<SettingField, String>,
    /// Teams in the new snapshot without a read-only channel. Only collected
    /// when something changed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_channels: Vec<TeamId>,
}

impl ConfigDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: SettingField) -> Option<&str> {
        self.changes.get(&field).map(String::as_str)
    }

    pub fn changed_fields(&self) -> impl Iterator<Item = SettingField> + '_ {
        self.changes.keys().copied()
    }
}

/// Compare the public settings of `old` and `new`.
///
/// When anything changed, teams known to `new` that have no managed channel
/// are reported (and logged) as missing. This never blocks publication.
#[must_use]
pub fn diff(old: &Snapshot, new: &Snapshot) -> ConfigDiff {
    let changes: BTreeMap<SettingField, String> = SettingField::ALL
        .iter()
        .filter(|field| old.setting(**field) != new.setting(**field))
        .map(|field| (*field, new.setting(*field).to_string()))
        .collect();

    if changes.is_empty() {
        return ConfigDiff::default();
    }

    let missing_channels = new.teams_missing_channel();
    for team_id in &missing_channels {
        warn!(team_id = %team_id, channel = %new.channel_name, "no read-only channel id for team");
    }

    ConfigDiff {
        changes,
        missing_channels,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        readonly_common::ChannelId,
        readonly_config::PluginSettings,
        rstest::rstest,
        std::collections::BTreeSet,
    };

    fn snapshot(identity: &str, channel: &str, style: &str) -> Snapshot {
        Snapshot::from_settings(&PluginSettings::new(identity, channel, style), true)
    }

    #[test]
    fn identical_settings_yield_empty_diff() {
        let mut new = snapshot("robot", "news", "bold");
        // Derived fields and the switch are ignored.
        new.enabled = false;
        new.managed_identity_id = Some("u1".into());
        new.known_team_ids = BTreeSet::from([TeamId::from("t1")]);

        let d = diff(&snapshot("robot", "news", "bold"), &new);
        assert!(d.is_empty());
        assert!(d.missing_channels.is_empty());
    }

    #[rstest]
    #[case(("robot", "news", "bold"), ("robot2", "news", "bold"), &[SettingField::IdentityName])]
    #[case(("robot", "news", "bold"), ("robot", "alerts", "bold"), &[SettingField::ChannelName])]
    #[case(("robot", "news", "bold"), ("robot", "news", "italic"), &[SettingField::TextStyle])]
    #[case(
        ("robot", "news", "bold"),
        ("bot", "alerts", "plain"),
        &[SettingField::IdentityName, SettingField::ChannelName, SettingField::TextStyle]
    )]
    fn reports_exactly_the_changed_fields(
        #[case] old: (&str, &str, &str),
        #[case] new: (&str, &str, &str),
        #[case] expected: &[SettingField],
    ) {
        let d = diff(&snapshot(old.0, old.1, old.2), &snapshot(new.0, new.1, new.2));
        assert_eq!(d.changed_fields().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn text_style_reports_its_own_new_value() {
        let d = diff(
            &snapshot("robot", "news", "bold"),
            &snapshot("robot", "news", "italic"),
        );
        assert_eq!(d.get(SettingField::TextStyle), Some("italic"));
        assert_eq!(d.get(SettingField::ChannelName), None);
    }

    #[test]
    fn missing_channels_are_listed_when_changed() {
        let mut new = snapshot("robot", "announcements", "");
        new.known_team_ids = BTreeSet::from([TeamId::from("t1"), TeamId::from("t2")]);
        new.managed_channel_ids
            .insert(TeamId::from("t1"), ChannelId::from("c1"));

        let d = diff(&Snapshot::default(), &new);
        assert_eq!(d.missing_channels, vec![TeamId::from("t2")]);
    }

    #[test]
    fn audit_record_uses_setting_keys() {
        let d = diff(
            &snapshot("robot", "news", "bold"),
            &snapshot("bot", "news", "plain"),
        );
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"changes": {"username": "bot", "text_style": "plain"}})
        );
    }
}
