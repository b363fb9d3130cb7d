use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use rewardcalc_types::{Address, Platform};

/// Reward amount emitted to a pool every `per_secs` seconds.
///
/// Kept as a ratio so that daily or weekly schedules stay exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionRate {
    pub amount: u128,
    pub per_secs: u64,
}

impl EmissionRate {
    pub const ZERO: Self = Self {
        amount: 0,
        per_secs: 1,
    };

    pub const fn per_second(amount: u128) -> Self {
        Self {
            amount,
            per_secs: 1,
        }
    }
}

/// A strategy's stake in a pool, `staked / total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolShare {
    pub staked: u128,
    pub total: u128,
}

impl PoolShare {
    pub const fn full(amount: u128) -> Self {
        Self {
            staked: amount,
            total: amount,
        }
    }
}

/// A pool a strategy is invested in, as reported by the strategy contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolDescriptor {
    pub platform: Platform,
    pub pool: Address,
    #[serde(default)]
    pub pool_id: u64,
    #[serde(default)]
    pub reward_tokens: Vec<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyInfo {
    pub address: Address,
    pub name: String,
    pub platform: Platform,
    /// Set once the strategy has been exited and no longer holds positions.
    #[serde(default)]
    pub decommissioned: bool,
    pub pools: Vec<PoolDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultInfo {
    pub address: Address,
    pub name: String,
    pub active: bool,
    pub strategy: Address,
    pub underlying: Address,
    /// Underlying held by the vault and its strategy, in raw token units.
    pub total_assets: u128,
}

/// Read-only copy of the registry taken at the start of an aggregate scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub vaults: Vec<Address>,
    /// Strategy names that are never scanned, e.g. `NoopStrategy`.
    #[serde(default)]
    pub excluded_strategies: BTreeSet<String>,
}

impl RegistrySnapshot {
    pub const fn new(vaults: Vec<Address>) -> Self {
        Self {
            vaults,
            excluded_strategies: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_excluded<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_strategies
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn is_excluded(&self, strategy_name: &str) -> bool {
        self.excluded_strategies.contains(strategy_name)
    }
}
