use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use tokio_util::sync::CancellationToken;

use rewardcalc_chain::{ChainStateReader, EmissionRate, PoolShare};
use rewardcalc_types::{Accrual, Address, Position, RewardEvent, Window, mul_div_floor};

use crate::{error::RewardError, query::QueryGuard};

/// Computes what a position earned over a time window, in raw token units.
pub struct RewardAccumulator {
    chain: Arc<dyn ChainStateReader>,
    guard: QueryGuard,
    concurrency: usize,
}

impl RewardAccumulator {
    pub fn new(chain: Arc<dyn ChainStateReader>, guard: QueryGuard, concurrency: usize) -> Self {
        Self {
            chain,
            guard,
            concurrency: concurrency.max(1),
        }
    }

    /// One event per reward token that accrued a non zero amount, stamped with
    /// the window end and listed in the position's reward token order.
    pub async fn accrue_rewards(
        &self,
        position: &Position,
        start: u64,
        end: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<RewardEvent>, RewardError> {
        let window = Window::new(start, end)?;
        if window.is_empty() {
            return Ok(Vec::new());
        }

        let amounts = match position.platform.accrual() {
            Accrual::Rate => self.accrue_by_rate(position, window, cancel).await?,
            Accrual::Delta => self.accrue_by_delta(position, window, cancel).await?,
        };

        Ok(position
            .reward_tokens
            .iter()
            .zip(amounts)
            .filter(|(_, amount)| *amount > 0)
            .map(|(token, amount)| RewardEvent {
                token: *token,
                amount,
                at: window.end,
            })
            .collect())
    }

    async fn accrue_by_rate(
        &self,
        position: &Position,
        window: Window,
        cancel: &CancellationToken,
    ) -> Result<Vec<u128>, RewardError> {
        let share = self
            .guard
            .chain(
                cancel,
                || format!("pool share of {} at {}", position.pool, window.start),
                self.chain.pool_share(position, window.start),
            )
            .await?;
        if share.total == 0 {
            tracing::debug!(
                "[RewardAccumulator] pool {} is empty at {}",
                position.pool.short(),
                window.start
            );
            return Ok(vec![0; position.reward_tokens.len()]);
        }

        let rates: Vec<EmissionRate> = stream::iter(position.reward_tokens.iter())
            .map(|token| {
                self.guard.chain(
                    cancel,
                    move || format!("emission rate of {token} in {}", position.pool),
                    self.chain.emission_rate(position, *token, window.start),
                )
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        position
            .reward_tokens
            .iter()
            .zip(rates)
            .map(|(token, rate)| rate_reward(rate, share, window.duration(), *token))
            .collect()
    }

    async fn accrue_by_delta(
        &self,
        position: &Position,
        window: Window,
        cancel: &CancellationToken,
    ) -> Result<Vec<u128>, RewardError> {
        stream::iter(position.reward_tokens.iter())
            .map(|token| async move {
                let (before, after) = tokio::try_join!(
                    self.balance(position, *token, window.start, cancel),
                    self.balance(position, *token, window.end, cancel),
                )?;
                if after < before {
                    tracing::debug!(
                        "[RewardAccumulator] balance of {} in {} went down ({before} -> {after})",
                        token.short(),
                        position.pool.short(),
                    );
                }
                Ok(after.saturating_sub(before))
            })
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    async fn balance(
        &self,
        position: &Position,
        token: Address,
        at: u64,
        cancel: &CancellationToken,
    ) -> Result<u128, RewardError> {
        self.guard
            .chain(
                cancel,
                || format!("balance of {token} in {} at {at}", position.pool),
                self.chain.balance_at(position, token, at),
            )
            .await
    }
}

/// `amount * duration * staked / (per_secs * total)`, floored.
fn rate_reward(
    rate: EmissionRate,
    share: PoolShare,
    duration: u64,
    token: Address,
) -> Result<u128, RewardError> {
    if rate.per_secs == 0 || share.total == 0 {
        return Ok(0);
    }
    // A strategy cannot hold more than the whole pool.
    let staked = share.staked.min(share.total);

    mul_div_floor(
        &[rate.amount, u128::from(duration), staked],
        &[u128::from(rate.per_secs), share.total],
    )
    .ok_or_else(|| RewardError::Overflow {
        what: format!("rate reward of {token}"),
    })
}
