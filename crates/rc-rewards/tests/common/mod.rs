#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use rust_decimal::Decimal;

use rewardcalc_chain::{
    ChainError, ChainStateReader, EmissionRate, PoolShare, PoolSnapshot, SnapshotChain,
    StrategyInfo, StrategySnapshot, VaultInfo,
};
use rewardcalc_quoting::{OracleError, PriceOracle, StaticPrices};
use rewardcalc_rewards::{CalculatorConfig, RewardCalculator};
use rewardcalc_types::{Address, Platform, Position, Token};

pub const NOW: u64 = 1_700_000_000;
pub const DAY: u64 = 86_400;
pub const WINDOW_START: u64 = NOW - DAY;
pub const WAD: u128 = 1_000_000_000_000_000_000;

pub const STRATEGY: u64 = 0x5701;
pub const OTHER_STRATEGY: u64 = 0x5702;
pub const STAKE_POOL: u64 = 0xf001;
pub const LP_POOL: u64 = 0xf002;
pub const LENDING_POOL: u64 = 0xf003;
pub const REWARD: u64 = 0xaa01;
pub const UNPRICED: u64 = 0xaa02;
pub const INTEREST: u64 = 0xaa03;

pub fn addr(value: u64) -> Address {
    Address::from(value)
}

pub fn test_config() -> CalculatorConfig {
    CalculatorConfig {
        query_timeout: Duration::from_secs(5),
        max_concurrent_queries: 4,
        ..CalculatorConfig::default()
    }
}

pub fn calculator(chain: impl ChainStateReader + 'static, oracle: impl PriceOracle + 'static) -> RewardCalculator {
    RewardCalculator::new(Arc::new(chain), Arc::new(oracle), test_config())
}

pub fn prices(entries: &[(u64, Decimal)]) -> StaticPrices {
    StaticPrices::from(
        entries
            .iter()
            .map(|(token, price)| (addr(*token), *price))
            .collect::<Vec<_>>(),
    )
}

/// 10 REWARD per day, all of the pool staked by the strategy.
pub fn stake_pool() -> PoolSnapshot {
    PoolSnapshot::new(Platform::SingleStake, addr(STAKE_POOL), 0, vec![addr(REWARD)])
        .with_share(0, PoolShare::full(500 * WAD))
        .with_emission(
            addr(REWARD),
            0,
            EmissionRate {
                amount: 10 * WAD,
                per_secs: DAY,
            },
        )
}

/// Pays 7 UNPRICED over the day.
pub fn unpriced_lp_pool() -> PoolSnapshot {
    PoolSnapshot::new(Platform::AmmLp, addr(LP_POOL), 1, vec![addr(UNPRICED)])
        .with_share(
            0,
            PoolShare {
                staked: 250,
                total: 1_000,
            },
        )
        .with_emission(
            addr(UNPRICED),
            0,
            EmissionRate {
                amount: 28 * WAD,
                per_secs: DAY,
            },
        )
}

/// INTEREST balance grows from 10 to 13 over the day.
pub fn lending_pool() -> PoolSnapshot {
    PoolSnapshot::new(Platform::Lending, addr(LENDING_POOL), 0, vec![addr(INTEREST)])
        .with_balance(addr(INTEREST), 0, 10 * WAD)
        .with_balance(addr(INTEREST), WINDOW_START + DAY / 2, 12 * WAD)
        .with_balance(addr(INTEREST), NOW, 13 * WAD)
}

pub fn base_chain() -> SnapshotChain {
    SnapshotChain::new(NOW)
        .with_token(addr(REWARD), 18)
        .with_token(addr(UNPRICED), 18)
        .with_token(addr(INTEREST), 18)
}

pub fn single_stake_chain() -> SnapshotChain {
    base_chain().with_strategy(
        StrategySnapshot::new(addr(STRATEGY), "StakeStrategy", Platform::SingleStake)
            .with_pool(stake_pool()),
    )
}

pub fn mixed_chain() -> SnapshotChain {
    base_chain().with_strategy(
        StrategySnapshot::new(addr(STRATEGY), "MixedStrategy", Platform::AmmLp)
            .with_pool(lending_pool())
            .with_pool(unpriced_lp_pool()),
    )
}

/// Oracle counting how often each token is priced.
#[derive(Default)]
pub struct CountingOracle {
    pub prices: StaticPrices,
    pub calls: AtomicUsize,
}

impl CountingOracle {
    pub fn new(prices: StaticPrices) -> Self {
        Self {
            prices,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceOracle for CountingOracle {
    async fn usd_price(&self, token: Address, at: u64) -> Result<Option<Decimal>, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prices.usd_price(token, at).await
    }
}

/// Oracle that fails for some tokens.
pub struct FlakyOracle {
    pub prices: StaticPrices,
    pub failing: HashMap<Address, String>,
}

#[async_trait]
impl PriceOracle for FlakyOracle {
    async fn usd_price(&self, token: Address, at: u64) -> Result<Option<Decimal>, OracleError> {
        if let Some(reason) = self.failing.get(&token) {
            return Err(OracleError::Unavailable(reason.clone()));
        }
        self.prices.usd_price(token, at).await
    }
}

/// Delays every position query of the wrapped chain.
pub struct SlowChain {
    pub inner: SnapshotChain,
    pub delay: Duration,
}

#[async_trait]
impl ChainStateReader for SlowChain {
    async fn current_timestamp(&self) -> Result<u64, ChainError> {
        self.inner.current_timestamp().await
    }

    async fn strategy(&self, address: Address) -> Result<Option<StrategyInfo>, ChainError> {
        self.inner.strategy(address).await
    }

    async fn vault(&self, address: Address) -> Result<Option<VaultInfo>, ChainError> {
        self.inner.vault(address).await
    }

    async fn token(&self, address: Address) -> Result<Token, ChainError> {
        self.inner.token(address).await
    }

    async fn emission_rate(
        &self,
        position: &Position,
        reward_token: Address,
        at: u64,
    ) -> Result<EmissionRate, ChainError> {
        tokio::time::sleep(self.delay).await;
        self.inner.emission_rate(position, reward_token, at).await
    }

    async fn pool_share(&self, position: &Position, at: u64) -> Result<PoolShare, ChainError> {
        tokio::time::sleep(self.delay).await;
        self.inner.pool_share(position, at).await
    }

    async fn balance_at(
        &self,
        position: &Position,
        token: Address,
        at: u64,
    ) -> Result<u128, ChainError> {
        tokio::time::sleep(self.delay).await;
        self.inner.balance_at(position, token, at).await
    }
}
