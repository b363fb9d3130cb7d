use async_trait::async_trait;

use rewardcalc_types::{Address, Position, Token};

use crate::{
    error::ChainError,
    models::{EmissionRate, PoolShare, RegistrySnapshot, StrategyInfo, VaultInfo},
};

/// Read access to chain state at the present or at a past timestamp.
///
/// Each platform answers the three position queries differently; callers only
/// see this capability interface.
#[async_trait]
pub trait ChainStateReader: Send + Sync {
    /// Timestamp of the latest block.
    async fn current_timestamp(&self) -> Result<u64, ChainError>;

    /// `None` when no strategy is deployed at `address`.
    async fn strategy(&self, address: Address) -> Result<Option<StrategyInfo>, ChainError>;

    /// `None` when no vault is deployed at `address`.
    async fn vault(&self, address: Address) -> Result<Option<VaultInfo>, ChainError>;

    async fn token(&self, address: Address) -> Result<Token, ChainError>;

    async fn emission_rate(
        &self,
        position: &Position,
        reward_token: Address,
        at: u64,
    ) -> Result<EmissionRate, ChainError>;

    async fn pool_share(&self, position: &Position, at: u64) -> Result<PoolShare, ChainError>;

    /// Balance of `token` accrued to the position (deposit plus interest, or claimable).
    async fn balance_at(
        &self,
        position: &Position,
        token: Address,
        at: u64,
    ) -> Result<u128, ChainError>;
}

/// Enumerates the vaults known to the protocol.
#[async_trait]
pub trait Bookkeeper: Send + Sync {
    async fn snapshot(&self) -> Result<RegistrySnapshot, ChainError>;
}
