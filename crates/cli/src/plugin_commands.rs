use std::{path::PathBuf, sync::Arc};

use {
    anyhow::{Context, Result},
    clap::Args,
    readonly_channels::{AppliedConfiguration, InMemoryDirectory, PostVerdict, ReadOnlyPlugin},
    readonly_common::{ChannelId, Post, UserId},
    readonly_config::PluginSettings,
    serde_json::{Value, json},
    tracing::info,
};

#[derive(Args)]
pub struct Source {
    /// Settings file (defaults to the discovered readonly.{toml,yaml,json}).
    #[arg(long, env = "READONLY_CONFIG")]
    config: Option<PathBuf>,
    /// JSON directory fixture with teams, channels and users.
    #[arg(long)]
    directory: PathBuf,
}

impl Source {
    fn settings(&self) -> Result<PluginSettings> {
        match self.config {
            Some(ref path) => readonly_config::load_settings(path)
                .with_context(|| format!("failed to load settings from {}", path.display())),
            None => Ok(readonly_config::discover_and_load()),
        }
    }

    fn directory(&self) -> Result<InMemoryDirectory> {
        let raw = std::fs::read_to_string(&self.directory)
            .with_context(|| format!("failed to read {}", self.directory.display()))?;
        InMemoryDirectory::from_json(&raw)
            .with_context(|| format!("invalid directory fixture {}", self.directory.display()))
    }

    fn apply(&self) -> Result<(ReadOnlyPlugin, AppliedConfiguration)> {
        let settings = self.settings()?;
        let plugin = ReadOnlyPlugin::new(Arc::new(self.directory()?));
        let applied = plugin
            .on_configuration_change(settings)
            .context("reconciliation failed")?;
        Ok((plugin, applied))
    }
}

pub fn reconcile(source: &Source) -> Result<()> {
    let (plugin, applied) = source.apply()?;
    let report = json!({
        "applied": applied,
        "snapshot": &*plugin.configuration(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub fn gate(source: &Source, author: &str, channel: &str, message: String) -> Result<()> {
    let post = Post {
        author_id: UserId::parse(author)?,
        channel_id: ChannelId::parse(channel)?,
        message,
    };
    let (plugin, applied) = source.apply()?;
    info!(version = applied.version, "configuration applied");

    let verdict = verdict_json(&plugin.message_will_be_posted(post));
    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(())
}

fn verdict_json(verdict: &PostVerdict) -> Value {
    match verdict {
        PostVerdict::Allow(post) => json!({
            "verdict": "allow",
            "post": post,
        }),
        PostVerdict::Dismiss { code, reason } => json!({
            "verdict": "dismiss",
            "code": code,
            "reason": reason.as_str(),
            "notice": reason.notice(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, readonly_channels::RejectReason, std::io::Write};

    const FIXTURE: &str = r#"{
      "teams": [{ "id": "t1", "name": "eng", "channels": [{ "id": "c1", "name": "announcements" }] }],
      "users": [{ "id": "u1", "username": "alice" }]
    }"#;

    fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::File::create(&path)
            .unwrap()
            .write_all(contents.as_bytes())
            .unwrap();
        path
    }

    fn source(dir: &tempfile::TempDir) -> Source {
        Source {
            config: Some(write(
                dir,
                "readonly.toml",
                "username = \"robot\"\nchannel_name = \"announcements\"\n",
            )),
            directory: write(dir, "directory.json", FIXTURE),
        }
    }

    #[test]
    fn apply_reconciles_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let (plugin, applied) = source(&dir).apply().unwrap();
        assert_eq!(applied.version, 1);
        assert_eq!(plugin.configuration().managed_channel_ids.len(), 1);
    }

    #[test]
    fn missing_fixture_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = source(&dir);
        source.directory = dir.path().join("nope.json");
        let err = source.apply().err().unwrap();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn dismiss_verdict_shape() {
        let value = verdict_json(&PostVerdict::Dismiss {
            code: readonly_channels::gating::DISMISS_POST_ERROR,
            reason: RejectReason::ManagedChannel,
        });
        assert_eq!(value["verdict"], "dismiss");
        assert_eq!(value["reason"], "managed_channel");
        assert_eq!(value["code"], "plugin.message_will_be_posted.dismiss_post");
    }
}
