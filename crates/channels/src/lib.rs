//! Read-only channel enforcement.
//!
//! One managed identity may post in one managed channel per team; everyone
//! else is turned away with an ephemeral notice, and mentions of the managed
//! identity are suppressed everywhere.
//!
//! Configuration changes flow Reconciler → [`diff`] → [`ConfigurationStore`]
//! before anything becomes visible to the message gate, which only ever sees
//! fully resolved snapshots.

pub mod diff;
pub mod directory;
pub mod directory_memory;
pub mod error;
pub mod gating;
pub mod plugin;
pub mod reconcile;
pub mod snapshot;
pub mod store;

pub use {
    diff::{ConfigDiff, diff},
    directory::{DirectoryError, DirectoryService, EphemeralNotice, NewIdentity, ServiceIdentity},
    directory_memory::{DirectoryFixture, InMemoryDirectory, Operation},
    error::{Error, Result},
    gating::{Decision, GateState, MessageGate, PostVerdict, RejectReason, decide},
    plugin::{AppliedConfiguration, ReadOnlyPlugin},
    reconcile::{Reconciler, Reconciliation, TeamFailure, TeamOutcomes},
    snapshot::Snapshot,
    store::{ConfigurationStore, Published},
};
