use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use rewardcalc_chain::{ChainStateReader, StrategyInfo};
use rewardcalc_types::{Address, Position};

use crate::{error::RewardError, query::QueryGuard};

/// Turns a strategy address into the reward-bearing positions it holds.
pub struct PositionResolver {
    chain: Arc<dyn ChainStateReader>,
    guard: QueryGuard,
}

impl PositionResolver {
    pub fn new(chain: Arc<dyn ChainStateReader>, guard: QueryGuard) -> Self {
        Self { chain, guard }
    }

    /// Positions held by `strategy`, ordered by platform then pool id.
    ///
    /// An unknown or decommissioned strategy holds nothing. Pools listed twice are
    /// merged, and pools paying no reward token are dropped.
    pub async fn resolve_positions(
        &self,
        strategy: Address,
        cancel: &CancellationToken,
    ) -> Result<Vec<Position>, RewardError> {
        let info = self
            .guard
            .chain(
                cancel,
                || format!("strategy {strategy}"),
                self.chain.strategy(strategy),
            )
            .await?;

        let Some(info) = info else {
            tracing::debug!("[PositionResolver] no strategy at {}", strategy.short());
            return Ok(Vec::new());
        };
        if info.decommissioned {
            tracing::debug!(
                "[PositionResolver] strategy {} ({}) is decommissioned",
                info.name,
                strategy.short()
            );
            return Ok(Vec::new());
        }

        Ok(positions_of(&info))
    }
}

fn positions_of(info: &StrategyInfo) -> Vec<Position> {
    let mut positions: Vec<Position> = Vec::with_capacity(info.pools.len());

    for pool in &info.pools {
        if let Some(existing) = positions
            .iter_mut()
            .find(|p| p.same_pool(pool.platform, pool.pool, pool.pool_id))
        {
            for token in &pool.reward_tokens {
                if !existing.reward_tokens.contains(token) {
                    existing.reward_tokens.push(*token);
                }
            }
            continue;
        }

        let mut reward_tokens = Vec::with_capacity(pool.reward_tokens.len());
        for token in &pool.reward_tokens {
            if !reward_tokens.contains(token) {
                reward_tokens.push(*token);
            }
        }
        positions.push(Position {
            strategy: info.address,
            platform: pool.platform,
            pool: pool.pool,
            pool_id: pool.pool_id,
            reward_tokens,
        });
    }

    positions.retain(|p| !p.reward_tokens.is_empty());
    // Stable: pools sharing a key keep the order the strategy reports them in.
    positions.sort_by_key(Position::ordering_key);
    positions
}
