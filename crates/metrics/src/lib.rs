//! Metric names for the readonly plugin.
//!
//! Recording goes through the `metrics` facade; without an installed
//! recorder every call is a no-op. Crates opt in with their `metrics`
//! feature.
//!
//! ```rust,ignore
//! use readonly_metrics::{counter, gate, labels};
//!
//! counter!(gate::POSTS_REJECTED_TOTAL, labels::REASON => "managed_channel").increment(1);
//! ```

mod definitions;

pub use definitions::*;

pub use metrics::{counter, gauge, histogram};
