//! Resolve configured names into directory identifiers.
//!
//! Fatal steps (managed identity, service identity, team listing) abort the
//! whole cycle. Per-team steps are best-effort: one team failing never
//! blocks the others, and the failures are returned alongside the snapshot.

use {
    readonly_common::{Identity, Team, TeamId, UserId},
    readonly_config::PluginSettings,
    serde::Serialize,
    tracing::{debug, info, warn},
};
#[cfg(feature = "metrics")]
use readonly_metrics::{counter, histogram, labels, reconcile as reconcile_metrics};

use crate::{
    directory::{DirectoryError, DirectoryService, NewIdentity, ServiceIdentity},
    error::{Error, Result},
    snapshot::Snapshot,
};

/// A best-effort step that failed for one team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamFailure {
    pub team_id: TeamId,
    pub error: DirectoryError,
}

/// Per-team results of one best-effort step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeamOutcomes {
    pub succeeded: Vec<TeamId>,
    /// Nothing to do for these teams (e.g. no channel with the configured
    /// name). Not an error.
    pub skipped: Vec<TeamId>,
    pub failed: Vec<TeamFailure>,
}

impl TeamOutcomes {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    #[must_use]
    pub fn failed_team_ids(&self) -> Vec<&TeamId> {
        self.failed.iter().map(|f| &f.team_id).collect()
    }
}

/// Output of one reconciliation cycle. Nothing here is published yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub snapshot: Snapshot,
    /// Adding the managed identity to each team.
    pub memberships: TeamOutcomes,
    /// Looking up the managed channel in each team.
    pub channels: TeamOutcomes,
}

pub struct Reconciler<'a> {
    directory: &'a dyn DirectoryService,
    service_identity: ServiceIdentity,
}

impl<'a> Reconciler<'a> {
    pub fn new(directory: &'a dyn DirectoryService) -> Self {
        Self {
            directory,
            service_identity: ServiceIdentity::default(),
        }
    }

    #[must_use]
    pub fn with_service_identity(mut self, service_identity: ServiceIdentity) -> Self {
        self.service_identity = service_identity;
        self
    }

    /// Build a fully resolved snapshot for `settings`.
    ///
    /// The scalar settings and `enabled` are copied unchanged; only the
    /// derived identifiers come from the directory.
    pub fn reconcile(&self, settings: &PluginSettings, enabled: bool) -> Result<Reconciliation> {
        #[cfg(feature = "metrics")]
        let started = std::time::Instant::now();
        #[cfg(feature = "metrics")]
        counter!(reconcile_metrics::RUNS_TOTAL).increment(1);

        info!(
            identity = %settings.identity_name,
            channel = %settings.channel_name,
            "reconciling read-only configuration"
        );

        let result = self.run(settings, enabled);

        #[cfg(feature = "metrics")]
        {
            histogram!(reconcile_metrics::DURATION_SECONDS).record(started.elapsed().as_secs_f64());
            if result.is_err() {
                counter!(reconcile_metrics::FAILURES_TOTAL).increment(1);
            }
        }

        result
    }

    fn run(&self, settings: &PluginSettings, enabled: bool) -> Result<Reconciliation> {
        let identity = self.ensure_managed_identity(&settings.identity_name)?;

        let service_id = self
            .directory
            .ensure_service_identity(&self.service_identity)
            .map_err(|e| Error::directory("failed to ensure read-only bot", e))?;

        let teams = self
            .directory
            .list_teams()
            .map_err(|e| Error::directory("failed to query teams", e))?;

        let memberships = self.ensure_memberships(&teams, &identity.id);

        let mut snapshot = Snapshot::from_settings(settings, enabled);
        snapshot.managed_identity_id = Some(identity.id);
        snapshot.service_identity_id = Some(service_id);
        snapshot.known_team_ids = teams.iter().map(|t| t.id.clone()).collect();
        let channels = self.resolve_channels(&teams, &settings.channel_name, &mut snapshot);

        info!(
            teams = teams.len(),
            managed_channels = snapshot.managed_channel_ids.len(),
            membership_failures = memberships.failed.len(),
            channel_failures = channels.failed.len(),
            "reconciliation complete"
        );

        Ok(Reconciliation {
            snapshot,
            memberships,
            channels,
        })
    }

    /// Look the user up, creating it if the lookup finds nothing or fails.
    ///
    /// A failed lookup is indistinguishable from a missing user, so both
    /// fall through to create; when the directory is down the create then
    /// fails too and that error is the one reported.
    fn ensure_managed_identity(&self, username: &str) -> Result<Identity> {
        match self.directory.find_identity_by_name(username) {
            Ok(Some(identity)) => {
                debug!(user_id = %identity.id, "managed identity found");
                return Ok(identity);
            },
            Ok(None) => debug!(username, "managed identity not found, creating"),
            Err(e) => debug!(username, error = %e, "managed identity lookup failed, creating"),
        }

        let identity = self
            .directory
            .create_identity(&NewIdentity::managed(username))
            .map_err(|e| Error::directory("failed to ensure read-only user", e))?;
        info!(user_id = %identity.id, username, "created managed identity");
        Ok(identity)
    }

    fn ensure_memberships(&self, teams: &[Team], user_id: &UserId) -> TeamOutcomes {
        let mut outcomes = TeamOutcomes::default();
        for team in teams {
            match self.directory.add_team_member(&team.id, user_id) {
                Ok(()) => outcomes.succeeded.push(team.id.clone()),
                Err(error) => {
                    warn!(team_id = %team.id, error = %error, "failed to add managed identity to team");
                    #[cfg(feature = "metrics")]
                    counter!(reconcile_metrics::TEAM_FAILURES_TOTAL, labels::STEP => "membership")
                        .increment(1);
                    outcomes.failed.push(TeamFailure {
                        team_id: team.id.clone(),
                        error,
                    });
                },
            }
        }
        outcomes
    }

    fn resolve_channels(
        &self,
        teams: &[Team],
        channel_name: &str,
        snapshot: &mut Snapshot,
    ) -> TeamOutcomes {
        let mut outcomes = TeamOutcomes::default();
        for team in teams {
            match self.directory.find_channel_by_name(&team.id, channel_name) {
                Ok(Some(channel)) => {
                    snapshot
                        .managed_channel_ids
                        .insert(team.id.clone(), channel.id);
                    outcomes.succeeded.push(team.id.clone());
                },
                Ok(None) => {
                    debug!(team_id = %team.id, channel = channel_name, "team has no read-only channel");
                    outcomes.skipped.push(team.id.clone());
                },
                Err(error) => {
                    warn!(team_id = %team.id, error = %error, "read-only channel lookup failed");
                    #[cfg(feature = "metrics")]
                    counter!(reconcile_metrics::TEAM_FAILURES_TOTAL, labels::STEP => "channel")
                        .increment(1);
                    outcomes.failed.push(TeamFailure {
                        team_id: team.id.clone(),
                        error,
                    });
                },
            }
        }
        outcomes
    }
}
