use std::{fmt, sync::Arc};

#[cfg(feature = "metrics")]
use readonly_metrics::{counter, gate as gate_metrics, labels};
use {
    readonly_common::Post,
    tracing::{debug, warn},
};

use crate::{
    directory::{DirectoryService, EphemeralNotice},
    snapshot::Snapshot,
    store::ConfigurationStore,
};

/// Host code telling the author's client to drop the post quietly instead of
/// showing an error.
pub const DISMISS_POST_ERROR: &str = "plugin.message_will_be_posted.dismiss_post";

pub const CHANNEL_NOTICE: &str = "Posting is not allowed in this channel.";

pub const MENTION_NOTICE: &str = "Shh! You must not talk about the read-only plugin user.";

/// Whether the policy applies, read fresh from each snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Enabled,
    Disabled,
    /// Switched on, but no reconciliation has resolved the managed identity
    /// yet. Nothing is gated.
    Unresolved,
}

impl GateState {
    #[must_use]
    pub fn of(snapshot: &Snapshot) -> Self {
        if !snapshot.enabled {
            Self::Disabled
        } else if snapshot.managed_identity_id.is_none() {
            Self::Unresolved
        } else {
            Self::Enabled
        }
    }
}

/// Why a post was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Posted by someone else into a read-only channel.
    ManagedChannel,
    /// Mentions the managed identity.
    MentionsManagedIdentity,
}

impl RejectReason {
    /// Text of the ephemeral notice shown to the author.
    #[must_use]
    pub fn notice(self) -> &'static str {
        match self {
            Self::ManagedChannel => CHANNEL_NOTICE,
            Self::MentionsManagedIdentity => MENTION_NOTICE,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ManagedChannel => "managed_channel",
            Self::MentionsManagedIdentity => "mention",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManagedChannel => write!(f, "channel is read-only"),
            Self::MentionsManagedIdentity => write!(f, "post mentions the read-only user"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Reject(RejectReason),
}

impl Decision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Decide whether `post` may be committed under `snapshot`.
///
/// First match wins:
/// 1. policy disabled or not yet resolved: allow;
/// 2. author is the managed or service identity: allow;
/// 3. channel is a managed channel: reject, whatever the body says;
/// 4. body contains `@<identity_name>`: reject;
/// 5. allow.
#[must_use]
pub fn decide(snapshot: &Snapshot, post: &Post) -> Decision {
    if GateState::of(snapshot) != GateState::Enabled {
        return Decision::Allow;
    }

    if snapshot.is_managed_identity(&post.author_id) {
        return Decision::Allow;
    }

    if snapshot.is_managed_channel(&post.channel_id) {
        return Decision::Reject(RejectReason::ManagedChannel);
    }

    if post.message.contains(&snapshot.mention()) {
        return Decision::Reject(RejectReason::MentionsManagedIdentity);
    }

    Decision::Allow
}

/// What the host should do with a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostVerdict {
    /// Commit the post unchanged.
    Allow(Post),
    /// Drop the post; `code` is the host's dismiss signal.
    Dismiss {
        code: &'static str,
        reason: RejectReason,
    },
}

impl PostVerdict {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow(_))
    }

    #[must_use]
    pub fn dismiss_code(&self) -> Option<&'static str> {
        match self {
            Self::Allow(_) => None,
            Self::Dismiss { code, .. } => Some(*code),
        }
    }
}

/// The message-posting hook.
///
/// Reads one snapshot per post and uses it for the whole decision, so a
/// concurrent `replace` is never observed halfway through.
pub struct MessageGate {
    store: Arc<ConfigurationStore>,
    directory: Arc<dyn DirectoryService>,
}

impl MessageGate {
    pub fn new(store: Arc<ConfigurationStore>, directory: Arc<dyn DirectoryService>) -> Self {
        Self { store, directory }
    }

    pub fn message_will_be_posted(&self, post: Post) -> PostVerdict {
        let snapshot = self.store.get();

        match decide(&snapshot, &post) {
            Decision::Allow => {
                #[cfg(feature = "metrics")]
                counter!(gate_metrics::POSTS_ALLOWED_TOTAL).increment(1);
                PostVerdict::Allow(post)
            },
            Decision::Reject(reason) => {
                debug!(
                    author_id = %post.author_id,
                    channel_id = %post.channel_id,
                    reason = reason.as_str(),
                    "post rejected"
                );
                #[cfg(feature = "metrics")]
                counter!(gate_metrics::POSTS_REJECTED_TOTAL, labels::REASON => reason.as_str())
                    .increment(1);
                self.notify(&snapshot, &post, reason);
                PostVerdict::Dismiss {
                    code: DISMISS_POST_ERROR,
                    reason,
                }
            },
        }
    }

    /// Tell the author why the post vanished. Delivery failures never change
    /// the verdict.
    fn notify(&self, snapshot: &Snapshot, post: &Post, reason: RejectReason) {
        let notice = EphemeralNotice {
            recipient_id: post.author_id.clone(),
            channel_id: post.channel_id.clone(),
            author_id: snapshot.managed_identity_id.clone(),
            message: reason.notice().to_string(),
        };
        if let Err(e) = self.directory.send_ephemeral_notice(&notice) {
            warn!(
                recipient_id = %notice.recipient_id,
                channel_id = %notice.channel_id,
                error = %e,
                "failed to send ephemeral notice"
            );
            #[cfg(feature = "metrics")]
            counter!(gate_metrics::NOTICE_FAILURES_TOTAL).increment(1);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::directory_memory::{InMemoryDirectory, Operation},
        readonly_common::{ChannelId, TeamId, UserId},
        readonly_config::PluginSettings,
        rstest::rstest,
    };

    fn snapshot() -> Snapshot {
        let mut s = Snapshot::from_settings(&PluginSettings::new("robot", "announcements", ""), true);
        s.managed_identity_id = Some(UserId::from("u-robot"));
        s.service_identity_id = Some(UserId::from("u-bot"));
        s.managed_channel_ids
            .insert(TeamId::from("team-a"), ChannelId::from("chan-a"));
        s
    }

    #[rstest]
    #[case("u-alice", "chan-a", "hello")]
    #[case("u-alice", "chan-b", "hi @robot")]
    #[case("u-robot", "chan-a", "announcement")]
    #[case("u-alice", "chan-b", "hello")]
    fn disabled_allows_everything(
        #[case] author: &str,
        #[case] channel: &str,
        #[case] body: &str,
    ) {
        let mut s = snapshot();
        s.enabled = false;
        assert_eq!(decide(&s, &Post::new(author, channel, body)), Decision::Allow);
    }

    #[rstest]
    #[case("u-robot")]
    #[case("u-bot")]
    fn managed_identities_may_post_anywhere(#[case] author: &str) {
        let s = snapshot();
        assert_eq!(decide(&s, &Post::new(author, "chan-a", "news")), Decision::Allow);
        assert_eq!(decide(&s, &Post::new(author, "chan-b", "I am @robot")), Decision::Allow);
    }

    #[rstest]
    #[case("")]
    #[case("hello")]
    #[case("hi @robot")]
    fn managed_channel_rejects_regardless_of_body(#[case] body: &str) {
        assert_eq!(
            decide(&snapshot(), &Post::new("u-alice", "chan-a", body)),
            Decision::Reject(RejectReason::ManagedChannel)
        );
    }

    #[rstest]
    #[case("hey @robot", true)]
    #[case("@robotics is fun", true)]
    #[case("robot", false)]
    #[case("@Robot", false)]
    #[case("mail robot@example.com", false)]
    fn mention_outside_managed_channel(#[case] body: &str, #[case] rejected: bool) {
        let decision = decide(&snapshot(), &Post::new("u-alice", "chan-b", body));
        if rejected {
            assert_eq!(decision, Decision::Reject(RejectReason::MentionsManagedIdentity));
        } else {
            assert!(decision.is_allowed());
        }
    }

    #[test]
    fn unconfigured_snapshot_allows() {
        let post = Post::new("u-alice", "chan-a", "hi @");
        assert!(decide(&Snapshot::default(), &post).is_allowed());
    }

    #[test]
    fn enabled_but_unresolved_snapshot_allows() {
        let mut s = Snapshot::default();
        s.enabled = true;
        assert_eq!(GateState::of(&s), GateState::Unresolved);
        assert!(decide(&s, &Post::new("u-alice", "chan-a", "email me @ noon")).is_allowed());
    }

    fn gate(snapshot: Snapshot) -> (MessageGate, Arc<InMemoryDirectory>) {
        let store = Arc::new(ConfigurationStore::new());
        store.replace(Arc::new(snapshot)).unwrap();
        let directory = Arc::new(InMemoryDirectory::new());
        (MessageGate::new(store, directory.clone()), directory)
    }

    #[test]
    fn rejection_sends_notice_as_managed_identity() {
        let (gate, directory) = gate(snapshot());
        let verdict = gate.message_will_be_posted(Post::new("u-alice", "chan-a", "hello"));

        assert_eq!(verdict.dismiss_code(), Some(DISMISS_POST_ERROR));
        assert_eq!(directory.notices(), vec![EphemeralNotice {
            recipient_id: "u-alice".into(),
            channel_id: "chan-a".into(),
            author_id: Some("u-robot".into()),
            message: CHANNEL_NOTICE.into(),
        }]);
    }

    #[test]
    fn mention_notice_goes_to_posting_channel() {
        let (gate, directory) = gate(snapshot());
        let verdict = gate.message_will_be_posted(Post::new("u-alice", "chan-z", "@robot hi"));

        assert!(matches!(verdict, PostVerdict::Dismiss {
            reason: RejectReason::MentionsManagedIdentity,
            ..
        }));
        let notices = directory.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].channel_id, ChannelId::from("chan-z"));
        assert_eq!(notices[0].message, MENTION_NOTICE);
    }

    #[test]
    fn allowed_post_is_returned_unmodified() {
        let (gate, directory) = gate(snapshot());
        let post = Post::new("u-alice", "chan-b", "just chatting");
        assert_eq!(gate.message_will_be_posted(post.clone()), PostVerdict::Allow(post));
        assert!(directory.notices().is_empty());
    }

    #[test]
    fn notice_failure_does_not_change_verdict() {
        let (gate, directory) = gate(snapshot());
        directory.fail(Operation::SendNotice);
        let verdict = gate.message_will_be_posted(Post::new("u-alice", "chan-a", "hello"));
        assert_eq!(verdict, PostVerdict::Dismiss {
            code: DISMISS_POST_ERROR,
            reason: RejectReason::ManagedChannel,
        });
    }
}
