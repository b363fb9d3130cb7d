//! Chain state replayed from a recorded snapshot.
//!
//! Every time-dependent value is a step function over samples: the value at
//! `t` is the last sample taken at or before `t`. Reads before the first sample
//! fail with [`ChainError::DataUnavailable`], like an archive node that has
//! pruned that far back.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    path::Path,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use rewardcalc_types::{Address, MAX_TOKEN_DECIMALS, Platform, Position, Token};

use crate::{
    error::{ChainError, SnapshotError},
    models::{
        EmissionRate, PoolDescriptor, PoolShare, RegistrySnapshot, StrategyInfo, VaultInfo,
    },
    reader::{Bookkeeper, ChainStateReader},
};

/// Time-ordered samples of a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History<T>(Vec<(u64, T)>);

impl<T> Default for History<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> History<T> {
    /// Inserts a sample; a later insert at the same timestamp wins.
    pub fn record(&mut self, at: u64, value: T) {
        let idx = self.0.partition_point(|(t, _)| *t <= at);
        self.0.insert(idx, (at, value));
    }

    pub fn value_at(&self, at: u64) -> Option<&T> {
        let idx = self.0.partition_point(|(t, _)| *t <= at);
        idx.checked_sub(1).map(|i| &self.0[i].1)
    }

    pub fn first_timestamp(&self) -> Option<u64> {
        self.0.first().map(|(t, _)| *t)
    }

    fn normalize(&mut self) {
        self.0.sort_by_key(|(t, _)| *t);
    }

    fn lookup(&self, at: u64, what: impl FnOnce() -> String) -> Result<&T, ChainError> {
        self.value_at(at).ok_or_else(|| {
            let reason = self.first_timestamp().map_or_else(
                || "no samples recorded".to_string(),
                |first| format!("history starts at {first}, requested {at}"),
            );
            ChainError::unavailable(what(), reason)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub platform: Platform,
    pub pool: Address,
    #[serde(default)]
    pub pool_id: u64,
    #[serde(default)]
    pub reward_tokens: Vec<Address>,
    #[serde(default)]
    pub share: History<PoolShare>,
    #[serde(default)]
    pub emissions: BTreeMap<Address, History<EmissionRate>>,
    #[serde(default)]
    pub balances: BTreeMap<Address, History<u128>>,
}

impl PoolSnapshot {
    pub fn new(platform: Platform, pool: Address, pool_id: u64, reward_tokens: Vec<Address>) -> Self {
        Self {
            platform,
            pool,
            pool_id,
            reward_tokens,
            share: History::default(),
            emissions: BTreeMap::new(),
            balances: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_share(mut self, at: u64, share: PoolShare) -> Self {
        self.share.record(at, share);
        self
    }

    #[must_use]
    pub fn with_emission(mut self, token: Address, at: u64, rate: EmissionRate) -> Self {
        self.emissions.entry(token).or_default().record(at, rate);
        self
    }

    #[must_use]
    pub fn with_balance(mut self, token: Address, at: u64, amount: u128) -> Self {
        self.balances.entry(token).or_default().record(at, amount);
        self
    }

    fn descriptor(&self) -> PoolDescriptor {
        PoolDescriptor {
            platform: self.platform,
            pool: self.pool,
            pool_id: self.pool_id,
            reward_tokens: self.reward_tokens.clone(),
        }
    }

    fn matches(&self, position: &Position) -> bool {
        self.pool == position.pool
            && self.pool_id == position.pool_id
            && self.platform == position.platform
    }

    fn normalize(&mut self) {
        self.share.normalize();
        self.emissions.values_mut().for_each(History::normalize);
        self.balances.values_mut().for_each(History::normalize);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategySnapshot {
    pub address: Address,
    pub name: String,
    pub platform: Platform,
    #[serde(default)]
    pub decommissioned: bool,
    #[serde(default)]
    pub pools: Vec<PoolSnapshot>,
}

impl StrategySnapshot {
    pub fn new(address: Address, name: impl Into<String>, platform: Platform) -> Self {
        Self {
            address,
            name: name.into(),
            platform,
            decommissioned: false,
            pools: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_pool(mut self, pool: PoolSnapshot) -> Self {
        self.pools.push(pool);
        self
    }

    #[must_use]
    pub const fn decommissioned(mut self) -> Self {
        self.decommissioned = true;
        self
    }

    fn info(&self) -> StrategyInfo {
        StrategyInfo {
            address: self.address,
            name: self.name.clone(),
            platform: self.platform,
            decommissioned: self.decommissioned,
            pools: self.pools.iter().map(PoolSnapshot::descriptor).collect(),
        }
    }
}

/// On-disk layout of a snapshot file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotFile {
    /// Timestamp of the latest block in the snapshot.
    pub now: u64,
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub strategies: Vec<StrategySnapshot>,
    #[serde(default)]
    pub vaults: Vec<VaultInfo>,
    #[serde(default)]
    pub excluded_strategies: BTreeSet<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotChain {
    now: u64,
    tokens: HashMap<Address, Token>,
    strategies: HashMap<Address, StrategySnapshot>,
    vaults: Vec<VaultInfo>,
    excluded_strategies: BTreeSet<String>,
}

impl SnapshotChain {
    pub fn new(now: u64) -> Self {
        Self {
            now,
            ..Default::default()
        }
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let file: SnapshotFile = serde_json::from_str(&raw)?;
        let chain = Self::from_file(file)?;
        tracing::info!(
            "[SnapshotChain] 📸 Loaded {} at t={} ({} strategies, {} vaults, {} tokens)",
            path.display(),
            chain.now,
            chain.strategies.len(),
            chain.vaults.len(),
            chain.tokens.len()
        );
        Ok(chain)
    }

    pub fn from_file(file: SnapshotFile) -> Result<Self, SnapshotError> {
        let mut chain = Self::new(file.now);
        chain.excluded_strategies = file.excluded_strategies;

        for token in file.tokens {
            if token.decimals > MAX_TOKEN_DECIMALS {
                return Err(SnapshotError::Invalid(format!(
                    "token {} has {} decimals (max {MAX_TOKEN_DECIMALS})",
                    token.address, token.decimals
                )));
            }
            chain.tokens.insert(token.address, token);
        }

        for mut strategy in file.strategies {
            strategy.pools.iter_mut().for_each(PoolSnapshot::normalize);
            let address = strategy.address;
            if chain.strategies.insert(address, strategy).is_some() {
                return Err(SnapshotError::Invalid(format!(
                    "strategy {address} listed twice"
                )));
            }
        }

        let mut seen = BTreeSet::new();
        for vault in &file.vaults {
            if !seen.insert(vault.address) {
                return Err(SnapshotError::Invalid(format!(
                    "vault {} listed twice",
                    vault.address
                )));
            }
        }
        chain.vaults = file.vaults;

        Ok(chain)
    }

    #[must_use]
    pub fn with_token(mut self, address: Address, decimals: u8) -> Self {
        self.tokens.insert(address, Token { address, decimals });
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: StrategySnapshot) -> Self {
        self.strategies.insert(strategy.address, strategy);
        self
    }

    #[must_use]
    pub fn with_vault(mut self, vault: VaultInfo) -> Self {
        self.vaults.retain(|v| v.address != vault.address);
        self.vaults.push(vault);
        self
    }

    #[must_use]
    pub fn with_excluded(mut self, name: impl Into<String>) -> Self {
        self.excluded_strategies.insert(name.into());
        self
    }

    pub const fn now(&self) -> u64 {
        self.now
    }

    fn check_not_future(&self, at: u64, what: impl FnOnce() -> String) -> Result<(), ChainError> {
        if at > self.now {
            return Err(ChainError::unavailable(
                what(),
                format!("requested {at} is after the latest block {}", self.now),
            ));
        }
        Ok(())
    }

    fn pool(&self, position: &Position) -> Result<&PoolSnapshot, ChainError> {
        self.strategies
            .get(&position.strategy)
            .and_then(|s| s.pools.iter().find(|p| p.matches(position)))
            .ok_or_else(|| {
                ChainError::not_found(format!(
                    "{} pool {}#{} of strategy {}",
                    position.platform, position.pool, position.pool_id, position.strategy
                ))
            })
    }
}

#[async_trait]
impl ChainStateReader for SnapshotChain {
    async fn current_timestamp(&self) -> Result<u64, ChainError> {
        Ok(self.now)
    }

    async fn strategy(&self, address: Address) -> Result<Option<StrategyInfo>, ChainError> {
        Ok(self.strategies.get(&address).map(StrategySnapshot::info))
    }

    async fn vault(&self, address: Address) -> Result<Option<VaultInfo>, ChainError> {
        Ok(self.vaults.iter().find(|v| v.address == address).cloned())
    }

    async fn token(&self, address: Address) -> Result<Token, ChainError> {
        self.tokens
            .get(&address)
            .copied()
            .ok_or_else(|| ChainError::not_found(format!("token {address}")))
    }

    async fn emission_rate(
        &self,
        position: &Position,
        reward_token: Address,
        at: u64,
    ) -> Result<EmissionRate, ChainError> {
        let what = || format!("emission of {reward_token} in pool {}", position.pool);
        self.check_not_future(at, what)?;
        let pool = self.pool(position)?;
        let history = pool
            .emissions
            .get(&reward_token)
            .ok_or_else(|| ChainError::unavailable(what(), "no emission history"))?;
        history.lookup(at, what).copied()
    }

    async fn pool_share(&self, position: &Position, at: u64) -> Result<PoolShare, ChainError> {
        let what = || format!("share of {} in pool {}", position.strategy, position.pool);
        self.check_not_future(at, what)?;
        self.pool(position)?.share.lookup(at, what).copied()
    }

    async fn balance_at(
        &self,
        position: &Position,
        token: Address,
        at: u64,
    ) -> Result<u128, ChainError> {
        let what = || format!("balance of {token} in pool {}", position.pool);
        self.check_not_future(at, what)?;
        let pool = self.pool(position)?;
        let history = pool
            .balances
            .get(&token)
            .ok_or_else(|| ChainError::unavailable(what(), "no balance history"))?;
        history.lookup(at, what).copied()
    }
}

#[async_trait]
impl Bookkeeper for SnapshotChain {
    async fn snapshot(&self) -> Result<RegistrySnapshot, ChainError> {
        Ok(
            RegistrySnapshot::new(self.vaults.iter().map(|v| v.address).collect())
                .with_excluded(self.excluded_strategies.iter().cloned()),
        )
    }
}
