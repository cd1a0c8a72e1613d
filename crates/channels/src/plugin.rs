//! Host-facing plugin: configuration changes, activation, and the posting
//! hook.

use std::sync::Arc;

use {
    readonly_common::Post,
    readonly_config::PluginSettings,
    serde::Serialize,
    tracing::{info, warn},
};

use crate::{
    diff::{ConfigDiff, diff},
    directory::DirectoryService,
    error::Result,
    gating::{MessageGate, PostVerdict},
    reconcile::{Reconciler, TeamOutcomes},
    snapshot::Snapshot,
    store::{ConfigurationStore, Published},
};

/// Result of a successful configuration change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedConfiguration {
    pub version: u64,
    pub diff: ConfigDiff,
    pub memberships: TeamOutcomes,
    pub channels: TeamOutcomes,
}

pub struct ReadOnlyPlugin {
    store: Arc<ConfigurationStore>,
    directory: Arc<dyn DirectoryService>,
    gate: MessageGate,
}

impl ReadOnlyPlugin {
    pub fn new(directory: Arc<dyn DirectoryService>) -> Self {
        let store = Arc::new(ConfigurationStore::new());
        let gate = MessageGate::new(Arc::clone(&store), Arc::clone(&directory));
        Self {
            store,
            directory,
            gate,
        }
    }

    /// The active snapshot.
    #[must_use]
    pub fn configuration(&self) -> Arc<Snapshot> {
        self.store.get()
    }

    #[must_use]
    pub fn store(&self) -> &Arc<ConfigurationStore> {
        &self.store
    }

    /// Reconcile `settings`, audit the change, then publish.
    ///
    /// No lock is held while the directory is called, so the directory may
    /// call back into the plugin. Nothing is published if reconciliation
    /// fails. A fresh plugin starts enabled; afterwards the `enabled` value
    /// active at publication time is kept, including a toggle that landed
    /// while this reconciliation was running.
    pub fn on_configuration_change(&self, settings: PluginSettings) -> Result<AppliedConfiguration> {
        let current = self.store.load();

        let reconciliation =
            Reconciler::new(self.directory.as_ref()).reconcile(&settings, enabled_after(&current))?;
        let diff = diff(&current.snapshot, &reconciliation.snapshot);
        audit(&diff);

        let mut next = reconciliation.snapshot;
        let version = self.store.replace_with(|active| {
            next.enabled = enabled_after(active);
            next
        });

        Ok(AppliedConfiguration {
            version,
            diff,
            memberships: reconciliation.memberships,
            channels: reconciliation.channels,
        })
    }

    pub fn on_activate(&self) -> u64 {
        self.set_enabled(true)
    }

    pub fn on_deactivate(&self) -> u64 {
        self.set_enabled(false)
    }

    /// Publish a copy of the active snapshot with `enabled` flipped.
    pub fn set_enabled(&self, enabled: bool) -> u64 {
        let version = self.store.update(|snapshot| snapshot.enabled = enabled);
        info!(enabled, version, "read-only policy toggled");
        version
    }

    pub fn message_will_be_posted(&self, post: Post) -> PostVerdict {
        self.gate.message_will_be_posted(post)
    }
}

fn enabled_after(active: &Published) -> bool {
    active.version == 0 || active.snapshot.enabled
}

fn audit(diff: &ConfigDiff) {
    if diff.is_empty() {
        return;
    }
    match serde_json::to_string(diff) {
        Ok(record) => info!(audit = %record, "read-only configuration changed"),
        Err(e) => warn!(error = %e, "failed to serialize configuration diff"),
    }
}
