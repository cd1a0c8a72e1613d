//! The active configuration snapshot.
//!
//! Readers take an `Arc<Snapshot>` and use it for the whole operation; the
//! read lock is held only long enough to clone the pointer. Writers swap in
//! a new `Arc` under the write lock.
//!
//! Never call into the directory (or anything that may re-enter the plugin)
//! while holding a guard from this module: the lock is not reentrant.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[cfg(feature = "metrics")]
use readonly_metrics::{counter, gauge, store as store_metrics};
use tracing::{debug, error};

use crate::{
    error::{Error, Result},
    snapshot::Snapshot,
};

/// A snapshot together with its publication number.
#[derive(Debug, Clone)]
pub struct Published {
    /// 0 until the first successful `replace`.
    pub version: u64,
    pub snapshot: Arc<Snapshot>,
}

pub struct ConfigurationStore {
    active: RwLock<Published>,
}

impl Default for ConfigurationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationStore {
    /// Start with the zero-value snapshot at version 0.
    pub fn new() -> Self {
        Self {
            active: RwLock::new(Published {
                version: 0,
                snapshot: Arc::new(Snapshot::default()),
            }),
        }
    }

    /// The active snapshot.
    #[must_use]
    pub fn get(&self) -> Arc<Snapshot> {
        Arc::clone(&self.read().snapshot)
    }

    /// The active snapshot and its version, read together.
    #[must_use]
    pub fn load(&self) -> Published {
        self.read().clone()
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.read().version
    }

    /// Publish `snapshot`, returning its version.
    ///
    /// Handing back the allocation that is already active means the caller
    /// mutated a published snapshot instead of cloning it; that is rejected
    /// with [`Error::SnapshotReused`]. The zero-value snapshot is exempt, so
    /// re-publishing "never configured" is a no-op.
    pub fn replace(&self, snapshot: Arc<Snapshot>) -> Result<u64> {
        let outcome = {
            let mut active = self.write();
            if Arc::ptr_eq(&active.snapshot, &snapshot) {
                if snapshot.is_default() {
                    Ok((active.version, None))
                } else {
                    Err(Error::SnapshotReused {
                        version: active.version,
                    })
                }
            } else {
                let (version, channels) = Self::swap(&mut active, snapshot);
                Ok((version, Some(channels)))
            }
        };

        match outcome {
            Ok((version, channels)) => {
                if let Some(channels) = channels {
                    published(version, channels);
                }
                Ok(version)
            },
            Err(e) => {
                error!(error = %e, "configuration store contract violation");
                Err(e)
            },
        }
    }

    /// Publish the snapshot `build` derives from the active one.
    ///
    /// `build` runs under the write lock, so a value read from the active
    /// snapshot cannot be overwritten by a concurrent writer before the
    /// result is published. It must not call out of the process.
    pub fn replace_with(&self, build: impl FnOnce(&Published) -> Snapshot) -> u64 {
        let (version, channels) = {
            let mut active = self.write();
            let next = build(&active);
            Self::swap(&mut active, Arc::new(next))
        };
        published(version, channels);
        version
    }

    /// Publish a modified clone of the active snapshot.
    pub fn update(&self, apply: impl FnOnce(&mut Snapshot)) -> u64 {
        self.replace_with(|active| {
            let mut next = Snapshot::clone(&active.snapshot);
            apply(&mut next);
            next
        })
    }

    /// Install `snapshot`, returning the new version and its managed channel
    /// count.
    fn swap(active: &mut Published, snapshot: Arc<Snapshot>) -> (u64, usize) {
        active.version += 1;
        active.snapshot = snapshot;
        (active.version, active.snapshot.managed_channel_ids.len())
    }

    fn read(&self) -> RwLockReadGuard<'_, Published> {
        self.active.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Published> {
        self.active.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn published(version: u64, managed_channels: usize) {
    debug!(version, managed_channels, "configuration snapshot published");
    #[cfg(feature = "metrics")]
    {
        counter!(store_metrics::PUBLISHED_TOTAL).increment(1);
        gauge!(store_metrics::MANAGED_CHANNELS).set(managed_channels as f64);
    }
}
