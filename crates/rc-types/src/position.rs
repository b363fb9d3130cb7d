use serde::{Deserialize, Serialize};

use crate::{address::Address, platform::Platform};

/// A token with its decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub address: Address,
    pub decimals: u8,
}

/// A reward-bearing position held by a strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub strategy: Address,
    pub platform: Platform,
    /// Reward pool (farm, lending market, ...) contract.
    pub pool: Address,
    /// Pool index inside the platform, e.g. a farm pid. Zero when unused.
    pub pool_id: u64,
    /// Tokens the pool pays out, in the order the pool lists them.
    pub reward_tokens: Vec<Address>,
}

impl Position {
    /// Positions are iterated by platform registration order, then pool id.
    pub const fn ordering_key(&self) -> (u8, u64) {
        (self.platform.registration_index(), self.pool_id)
    }

    /// Whether both positions sit in the same pool of the same platform.
    pub fn same_pool(&self, platform: Platform, pool: Address, pool_id: u64) -> bool {
        self.platform == platform && self.pool == pool && self.pool_id == pool_id
    }
}

/// Raw amount of a token earned, observed at `at` (unix seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEvent {
    pub token: Address,
    pub amount: u128,
    pub at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("window end {end} is before window start {start}")]
    Inverted { start: u64, end: u64 },
    #[error("period must be positive, got {0}")]
    NonPositivePeriod(i64),
    #[error("period of {period}s reaches before the chain origin (now = {end})")]
    BeforeOrigin { period: u64, end: u64 },
}

/// Closed time window in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: u64,
    pub end: u64,
}

impl Window {
    pub const fn new(start: u64, end: u64) -> Result<Self, WindowError> {
        if end < start {
            return Err(WindowError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// The `period_secs` seconds ending at `end`.
    pub fn ending_at(end: u64, period_secs: i64) -> Result<Self, WindowError> {
        if period_secs <= 0 {
            return Err(WindowError::NonPositivePeriod(period_secs));
        }
        let period = period_secs.unsigned_abs();
        let start = end
            .checked_sub(period)
            .ok_or(WindowError::BeforeOrigin { period, end })?;
        Ok(Self { start, end })
    }

    pub const fn duration(&self) -> u64 {
        self.end - self.start
    }

    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_ending_at() {
        let window = Window::ending_at(1_000_000, 86_400).unwrap();
        assert_eq!(window.start, 913_600);
        assert_eq!(window.duration(), 86_400);
        assert!(!window.is_empty());
    }

    #[test]
    fn test_window_rejects_bad_periods() {
        assert_eq!(
            Window::ending_at(100, 0),
            Err(WindowError::NonPositivePeriod(0))
        );
        assert_eq!(
            Window::ending_at(100, -5),
            Err(WindowError::NonPositivePeriod(-5))
        );
        assert!(matches!(
            Window::ending_at(100, 101),
            Err(WindowError::BeforeOrigin { .. })
        ));
        assert!(Window::new(10, 9).is_err());
        assert!(Window::new(10, 10).unwrap().is_empty());
    }
}
