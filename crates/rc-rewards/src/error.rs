use thiserror::Error;

use rewardcalc_chain::ChainError;
use rewardcalc_types::{ParseAddressError, WindowError};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RewardError {
    /// The caller passed a bad address, window or period. Never worth retrying.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A chain read failed or timed out. The caller may retry with backoff.
    #[error("data unavailable for {what}: {reason}")]
    DataUnavailable { what: String, reason: String },

    #[error("accrued amount overflows for {what}")]
    Overflow { what: String },

    #[error("computation cancelled")]
    Cancelled,
}

impl RewardError {
    pub fn unavailable(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            what: what.into(),
            reason: reason.into(),
        }
    }

    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::DataUnavailable { .. })
    }

    /// Short label for logs and metrics.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::DataUnavailable { .. } => "data_unavailable",
            Self::Overflow { .. } => "overflow",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<ChainError> for RewardError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::DataUnavailable { what, reason } => Self::DataUnavailable { what, reason },
            ChainError::NotFound { what } => Self::DataUnavailable {
                what,
                reason: "not found".to_string(),
            },
            ChainError::Transport(reason) => Self::DataUnavailable {
                what: "chain state".to_string(),
                reason,
            },
        }
    }
}

impl From<WindowError> for RewardError {
    fn from(err: WindowError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl From<ParseAddressError> for RewardError {
    fn from(err: ParseAddressError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}
