//! Metric name and label definitions.

/// Message gate metrics
pub mod gate {
    /// Posts let through unchanged
    pub const POSTS_ALLOWED_TOTAL: &str = "readonly_gate_posts_allowed_total";
    /// Posts dismissed by the gate (label: reason)
    pub const POSTS_REJECTED_TOTAL: &str = "readonly_gate_posts_rejected_total";
    /// Ephemeral notices that could not be delivered
    pub const NOTICE_FAILURES_TOTAL: &str = "readonly_gate_notice_failures_total";
}

/// Reconciliation metrics
pub mod reconcile {
    /// Reconciliation cycles started
    pub const RUNS_TOTAL: &str = "readonly_reconcile_runs_total";
    /// Reconciliation cycles that failed before publishing
    pub const FAILURES_TOTAL: &str = "readonly_reconcile_failures_total";
    /// Best-effort per-team steps that failed (label: step)
    pub const TEAM_FAILURES_TOTAL: &str = "readonly_reconcile_team_failures_total";
    /// Duration of a reconciliation cycle in seconds
    pub const DURATION_SECONDS: &str = "readonly_reconcile_duration_seconds";
}

/// Configuration store metrics
pub mod store {
    /// Snapshots published
    pub const PUBLISHED_TOTAL: &str = "readonly_store_snapshots_published_total";
    /// Teams with a managed channel in the active snapshot
    pub const MANAGED_CHANNELS: &str = "readonly_store_managed_channels";
}

/// Common label keys
pub mod labels {
    pub const REASON: &str = "reason";
    pub const STEP: &str = "step";
}
