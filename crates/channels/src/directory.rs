//! The host directory of teams, users and channels.
//!
//! Calls are synchronous and may block; they are made only from the
//! reconciler and when delivering notices, never while the configuration
//! store is locked.

use {
    readonly_common::{Channel, ChannelId, Identity, Team, TeamId, UserId},
    serde::Serialize,
};

/// Failure reported by a directory call.
///
/// Whether a failure is fatal is decided by the caller, not by the variant:
/// the same `Unavailable` aborts reconciliation when listing teams and is
/// merely logged when adding a team member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DirectoryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    Conflict(String),

    #[error("directory unavailable: {0}")]
    Unavailable(String),

    #[error("directory call timed out after {0} ms")]
    Timeout(u64),

    #[error("{0}")]
    Other(String),
}

/// Attributes for creating the managed identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewIdentity {
    pub username: String,
    pub email: String,
    pub nickname: String,
    pub first_name: String,
    pub position: String,
}

impl NewIdentity {
    /// The fixed display attributes used for the read-only user.
    pub fn managed(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: "rouser@readonly.invalid".into(),
            nickname: "ROUser".into(),
            first_name: "ROUser".into(),
            position: "Bot".into(),
        }
    }
}

/// Attributes for the secondary bot account, ensured idempotently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceIdentity {
    pub username: String,
    pub display_name: String,
    pub description: String,
}

impl Default for ServiceIdentity {
    fn default() -> Self {
        Self {
            username: "readonlybot".into(),
            display_name: "Read-only Bot".into(),
            description: "A bot account created by the read-only plugin.".into(),
        }
    }
}

/// A message shown only to `recipient_id`, never persisted for others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EphemeralNotice {
    pub recipient_id: UserId,
    pub channel_id: ChannelId,
    /// `None` when the managed identity is not resolved yet; the host then
    /// posts as itself.
    pub author_id: Option<UserId>,
    pub message: String,
}

/// Host-provided directory operations.
pub trait DirectoryService: Send + Sync {
    fn list_teams(&self) -> Result<Vec<Team>, DirectoryError>;

    /// `Ok(None)` when no user has `username`.
    fn find_identity_by_name(&self, username: &str) -> Result<Option<Identity>, DirectoryError>;

    fn create_identity(&self, identity: &NewIdentity) -> Result<Identity, DirectoryError>;

    /// Look up or create the bot account. Must be idempotent.
    fn ensure_service_identity(&self, service: &ServiceIdentity) -> Result<UserId, DirectoryError>;

    /// Adding an existing member is not an error.
    fn add_team_member(&self, team_id: &TeamId, user_id: &UserId) -> Result<(), DirectoryError>;

    /// `Ok(None)` when the team has no channel called `name`.
    fn find_channel_by_name(
        &self,
        team_id: &TeamId,
        name: &str,
    ) -> Result<Option<Channel>, DirectoryError>;

    fn send_ephemeral_notice(&self, notice: &EphemeralNotice) -> Result<(), DirectoryError>;
}
