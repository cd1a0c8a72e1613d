use crate::directory::DirectoryError;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input payload or parameter is invalid.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// A directory call failed on a step that aborts reconciliation.
    #[error("{context}: {source}")]
    Directory {
        context: String,
        #[source]
        source: DirectoryError,
    },

    /// `replace` was handed the snapshot that is already active. The caller
    /// modified the published snapshot instead of cloning it first.
    #[error("replace called with the active snapshot (version {version})")]
    SnapshotReused { version: u64 },

    /// JSON (de)serialization failed.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn directory(context: impl Into<String>, source: DirectoryError) -> Self {
        Self::Directory {
            context: context.into(),
            source,
        }
    }

    /// Returns `true` for misuse of the store API, as opposed to a runtime
    /// failure.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::SnapshotReused { .. })
    }
}
