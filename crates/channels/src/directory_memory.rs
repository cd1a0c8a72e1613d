//! In-memory directory for tests and offline runs.

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::Mutex,
};

use {
    readonly_common::{Channel, ChannelId, Identity, Team, TeamId, UserId},
    serde::Deserialize,
};

use crate::{
    directory::{DirectoryError, DirectoryService, EphemeralNotice, NewIdentity, ServiceIdentity},
    error::{self, Error},
};

/// Directory operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListTeams,
    FindIdentity,
    CreateIdentity,
    EnsureServiceIdentity,
    AddTeamMember,
    FindChannel,
    SendNotice,
}

#[derive(Default)]
struct State {
    teams: Vec<Team>,
    users: HashMap<String, Identity>,
    bots: HashMap<String, UserId>,
    members: BTreeSet<(TeamId, UserId)>,
    channels: Vec<Channel>,
    notices: Vec<EphemeralNotice>,
    created: Vec<String>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

#[derive(Default)]
struct Failures {
    all: HashSet<Operation>,
    per_team: HashSet<(Operation, TeamId)>,
}

/// Directory backed by `HashMap`s. No persistence.
///
/// Failures can be injected per operation, or per team for the per-team
/// operations, to exercise partial reconciliation.
#[derive(Default)]
pub struct InMemoryDirectory {
    state: Mutex<State>,
    failures: Mutex<Failures>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from a parsed fixture.
    pub fn from_fixture(fixture: DirectoryFixture) -> error::Result<Self> {
        let directory = Self::new();
        for team in fixture.teams {
            let team_id = TeamId::parse(&team.id).map_err(Error::invalid_input)?;
            directory.add_team(team_id.clone(), team.name);
            for channel in team.channels {
                let channel_id = ChannelId::parse(&channel.id).map_err(Error::invalid_input)?;
                directory.add_channel(team_id.clone(), channel_id, channel.name);
            }
        }
        for user in fixture.users {
            let user_id = UserId::parse(&user.id).map_err(Error::invalid_input)?;
            directory.add_identity(user_id, user.username);
        }
        Ok(directory)
    }

    /// Build a directory from a JSON fixture document.
    pub fn from_json(raw: &str) -> error::Result<Self> {
        Self::from_fixture(serde_json::from_str(raw)?)
    }

    pub fn add_team(&self, id: impl Into<TeamId>, name: impl Into<String>) -> Team {
        let team = Team {
            id: id.into(),
            name: name.into(),
        };
        self.state().teams.push(team.clone());
        team
    }

    pub fn add_channel(
        &self,
        team_id: impl Into<TeamId>,
        id: impl Into<ChannelId>,
        name: impl Into<String>,
    ) -> Channel {
        let channel = Channel {
            id: id.into(),
            team_id: team_id.into(),
            name: name.into(),
        };
        self.state().channels.push(channel.clone());
        channel
    }

    pub fn add_identity(&self, id: impl Into<UserId>, username: impl Into<String>) -> Identity {
        let identity = Identity {
            id: id.into(),
            username: username.into(),
        };
        self.state()
            .users
            .insert(identity.username.clone(), identity.clone());
        identity
    }

    pub fn remove_channel(&self, id: &ChannelId) {
        self.state().channels.retain(|c| &c.id != id);
    }

    /// Make every call to `operation` fail.
    pub fn fail(&self, operation: Operation) {
        self.failures().all.insert(operation);
    }

    /// Make `operation` fail for one team only.
    pub fn fail_for_team(&self, operation: Operation, team_id: impl Into<TeamId>) {
        self.failures().per_team.insert((operation, team_id.into()));
    }

    pub fn clear_failures(&self) {
        let mut failures = self.failures();
        failures.all.clear();
        failures.per_team.clear();
    }

    /// Notices sent so far, oldest first.
    #[must_use]
    pub fn notices(&self) -> Vec<EphemeralNotice> {
        self.state().notices.clone()
    }

    /// Usernames created through `create_identity`, oldest first.
    #[must_use]
    pub fn created_identities(&self) -> Vec<String> {
        self.state().created.clone()
    }

    #[must_use]
    pub fn is_member(&self, team_id: &TeamId, user_id: &UserId) -> bool {
        self.state()
            .members
            .contains(&(team_id.clone(), user_id.clone()))
    }

    #[must_use]
    pub fn identity(&self, username: &str) -> Option<Identity> {
        self.state().users.get(username).cloned()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn failures(&self) -> std::sync::MutexGuard<'_, Failures> {
        self.failures.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self, operation: Operation, team_id: Option<&TeamId>) -> Result<(), DirectoryError> {
        let failures = self.failures();
        let injected = failures.all.contains(&operation)
            || team_id.is_some_and(|t| failures.per_team.contains(&(operation, t.clone())));
        if injected {
            return Err(DirectoryError::Unavailable(format!(
                "injected failure for {operation:?}"
            )));
        }
        Ok(())
    }
}

impl DirectoryService for InMemoryDirectory {
    fn list_teams(&self) -> Result<Vec<Team>, DirectoryError> {
        self.check(Operation::ListTeams, None)?;
        Ok(self.state().teams.clone())
    }

    fn find_identity_by_name(&self, username: &str) -> Result<Option<Identity>, DirectoryError> {
        self.check(Operation::FindIdentity, None)?;
        Ok(self.state().users.get(username).cloned())
    }

    fn create_identity(&self, identity: &NewIdentity) -> Result<Identity, DirectoryError> {
        self.check(Operation::CreateIdentity, None)?;
        let mut state = self.state();
        if state.users.contains_key(&identity.username) {
            return Err(DirectoryError::Conflict(format!(
                "username {:?}",
                identity.username
            )));
        }
        let created = Identity {
            id: UserId::new(state.next_id("user")),
            username: identity.username.clone(),
        };
        state
            .users
            .insert(created.username.clone(), created.clone());
        state.created.push(created.username.clone());
        Ok(created)
    }

    fn ensure_service_identity(&self, service: &ServiceIdentity) -> Result<UserId, DirectoryError> {
        self.check(Operation::EnsureServiceIdentity, None)?;
        let mut state = self.state();
        if let Some(id) = state.bots.get(&service.username) {
            return Ok(id.clone());
        }
        let id = UserId::new(state.next_id("bot"));
        state.bots.insert(service.username.clone(), id.clone());
        Ok(id)
    }

    fn add_team_member(&self, team_id: &TeamId, user_id: &UserId) -> Result<(), DirectoryError> {
        self.check(Operation::AddTeamMember, Some(team_id))?;
        let mut state = self.state();
        if !state.teams.iter().any(|t| &t.id == team_id) {
            return Err(DirectoryError::NotFound(format!("team {team_id}")));
        }
        state.members.insert((team_id.clone(), user_id.clone()));
        Ok(())
    }

    fn find_channel_by_name(
        &self,
        team_id: &TeamId,
        name: &str,
    ) -> Result<Option<Channel>, DirectoryError> {
        self.check(Operation::FindChannel, Some(team_id))?;
        Ok(self
            .state()
            .channels
            .iter()
            .find(|c| &c.team_id == team_id && c.name == name)
            .cloned())
    }

    fn send_ephemeral_notice(&self, notice: &EphemeralNotice) -> Result<(), DirectoryError> {
        self.check(Operation::SendNotice, None)?;
        self.state().notices.push(notice.clone());
        Ok(())
    }
}

/// JSON shape accepted by [`InMemoryDirectory::from_json`].
///
/// ```json
/// {
///   "teams": [
///     { "id": "t1", "name": "eng", "channels": [{ "id": "c1", "name": "announcements" }] }
///   ],
///   "users": [{ "id": "u1", "username": "alice" }]
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DirectoryFixture {
    pub teams: Vec<FixtureTeam>,
    pub users: Vec<FixtureUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureTeam {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub channels: Vec<FixtureChannel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureChannel {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureUser {
    pub id: String,
    pub username: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn create_conflicts_with_existing_username() {
        let dir = InMemoryDirectory::new();
        dir.add_identity("u1", "robot");
        let err = dir.create_identity(&NewIdentity::managed("robot")).unwrap_err();
        assert!(matches!(err, DirectoryError::Conflict(_)));
    }

    #[test]
    fn ensure_service_identity_is_idempotent() {
        let dir = InMemoryDirectory::new();
        let first = dir
            .ensure_service_identity(&ServiceIdentity::default())
            .unwrap();
        let second = dir
            .ensure_service_identity(&ServiceIdentity::default())
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn per_team_failure_only_hits_that_team() {
        let dir = InMemoryDirectory::new();
        dir.add_team("t1", "one");
        dir.add_team("t2", "two");
        dir.fail_for_team(Operation::AddTeamMember, "t1");

        let user = UserId::from("u1");
        assert!(dir.add_team_member(&"t1".into(), &user).is_err());
        assert!(dir.add_team_member(&"t2".into(), &user).is_ok());
        assert!(dir.is_member(&"t2".into(), &user));
        assert!(!dir.is_member(&"t1".into(), &user));
    }

    #[test]
    fn channel_lookup_is_scoped_to_team() {
        let dir = InMemoryDirectory::new();
        dir.add_team("t1", "one");
        dir.add_team("t2", "two");
        dir.add_channel("t1", "c1", "announcements");

        assert!(
            dir.find_channel_by_name(&"t1".into(), "announcements")
                .unwrap()
                .is_some()
        );
        assert!(
            dir.find_channel_by_name(&"t2".into(), "announcements")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn loads_json_fixture() {
        let dir = InMemoryDirectory::from_json(
            r#"{
                "teams": [
                    {"id": "t1", "name": "eng", "channels": [{"id": "c1", "name": "announcements"}]},
                    {"id": "t2", "name": "ops"}
                ],
                "users": [{"id": "u1", "username": "alice"}]
            }"#,
        )
        .unwrap();
        assert_eq!(dir.list_teams().unwrap().len(), 2);
        assert_eq!(dir.identity("alice").unwrap().id, UserId::from("u1"));
    }

    #[test]
    fn fixture_with_blank_id_is_rejected() {
        let err = InMemoryDirectory::from_json(r#"{"teams": [{"id": " ", "name": "x"}]}"#)
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }
}
