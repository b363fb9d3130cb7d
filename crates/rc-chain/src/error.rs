use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    /// The state exists in principle but cannot be read (pruned history, timeout, ...).
    #[error("state unavailable for {what}: {reason}")]
    DataUnavailable { what: String, reason: String },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("transport error: {0}")]
    Transport(String),
}

impl ChainError {
    pub fn unavailable(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            what: what.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Error raised while loading a state snapshot file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("cannot read snapshot file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid snapshot: {0}")]
    Invalid(String),
}
