//! Shared identifiers, directory entity types, and error plumbing used by
//! every readonly crate.

pub mod error;
pub mod types;

pub use {
    error::{Error, FromMessage, Result},
    types::{Channel, ChannelId, Identity, Post, Team, TeamId, UserId},
};
