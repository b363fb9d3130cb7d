use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Why a token or position was left out of a total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum WarningKind {
    /// The oracle has no price for the token at that time.
    MissingPrice,
    /// The oracle query failed or timed out.
    OracleUnavailable(String),
    /// Token metadata (decimals) could not be read.
    TokenUnavailable(String),
    /// The valued amount does not fit the fixed-point range.
    Overflow,
}

impl WarningKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MissingPrice => "missing_price",
            Self::OracleUnavailable(_) => "oracle_unavailable",
            Self::TokenUnavailable(_) => "token_unavailable",
            Self::Overflow => "overflow",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataWarning {
    pub subject: Address,
    #[serde(flatten)]
    pub kind: WarningKind,
}

impl DataWarning {
    pub const fn new(subject: Address, kind: WarningKind) -> Self {
        Self { subject, kind }
    }
}

impl fmt::Display for DataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WarningKind::MissingPrice => write!(f, "no price for {}", self.subject),
            WarningKind::OracleUnavailable(reason) => {
                write!(f, "oracle unavailable for {}: {reason}", self.subject)
            }
            WarningKind::TokenUnavailable(reason) => {
                write!(f, "token {} unreadable: {reason}", self.subject)
            }
            WarningKind::Overflow => write!(f, "value of {} overflows", self.subject),
        }
    }
}

/// A successful result that may have skipped some inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialResult<T> {
    pub value: T,
    pub warnings: Vec<DataWarning>,
}

impl<T> PartialResult<T> {
    pub const fn complete(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub const fn with_warnings(value: T, warnings: Vec<DataWarning>) -> Self {
        Self { value, warnings }
    }

    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> PartialResult<U> {
        PartialResult {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}

impl<T: Default> Default for PartialResult<T> {
    fn default() -> Self {
        Self::complete(T::default())
    }
}
