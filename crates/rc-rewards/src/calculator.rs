use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use rewardcalc_chain::ChainStateReader;
use rewardcalc_metrics::MetricsRegistry;
use rewardcalc_quoting::PriceOracle;
use rewardcalc_types::{
    Address, DataWarning, PartialResult, Position, RewardEvent, Usd, Window, WindowError,
};

use crate::{
    accumulator::RewardAccumulator, config::CalculatorConfig, error::RewardError,
    query::QueryGuard, resolver::PositionResolver, valuation::ValuationEngine,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionRewards {
    pub position: Position,
    pub events: Vec<RewardEvent>,
}

/// Everything a strategy earned over one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyRewards {
    pub strategy: Address,
    pub window: Window,
    pub positions: Vec<PositionRewards>,
    pub total_usd: Usd,
    pub warnings: Vec<DataWarning>,
}

impl StrategyRewards {
    pub fn events(&self) -> impl Iterator<Item = &RewardEvent> {
        self.positions.iter().flat_map(|p| p.events.iter())
    }

    pub fn into_partial(self) -> PartialResult<Usd> {
        PartialResult::with_warnings(self.total_usd, self.warnings)
    }
}

/// USD value of what a strategy earned over a trailing period.
pub struct RewardCalculator {
    chain: Arc<dyn ChainStateReader>,
    config: CalculatorConfig,
    guard: QueryGuard,
    resolver: PositionResolver,
    accumulator: RewardAccumulator,
    valuation: ValuationEngine,
}

impl RewardCalculator {
    pub fn new(
        chain: Arc<dyn ChainStateReader>,
        oracle: Arc<dyn PriceOracle>,
        config: CalculatorConfig,
    ) -> Self {
        let guard = QueryGuard::new(config.query_timeout);
        Self {
            resolver: PositionResolver::new(chain.clone(), guard),
            accumulator: RewardAccumulator::new(chain.clone(), guard, config.concurrency()),
            valuation: ValuationEngine::new(chain.clone(), oracle, guard, config.concurrency()),
            chain,
            config,
            guard,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.valuation = self.valuation.with_metrics(metrics);
        self
    }

    pub const fn config(&self) -> &CalculatorConfig {
        &self.config
    }

    pub fn chain(&self) -> &Arc<dyn ChainStateReader> {
        &self.chain
    }

    pub const fn valuation(&self) -> &ValuationEngine {
        &self.valuation
    }

    pub const fn guard(&self) -> QueryGuard {
        self.guard
    }

    pub async fn strategy_rewards_usd(
        &self,
        strategy: Address,
        period_secs: i64,
    ) -> Result<PartialResult<Usd>, RewardError> {
        self.strategy_rewards_usd_with_cancel(strategy, period_secs, &CancellationToken::new())
            .await
    }

    pub async fn strategy_rewards_usd_with_cancel(
        &self,
        strategy: Address,
        period_secs: i64,
        cancel: &CancellationToken,
    ) -> Result<PartialResult<Usd>, RewardError> {
        self.strategy_rewards(strategy, period_secs, cancel)
            .await
            .map(StrategyRewards::into_partial)
    }

    /// Per position breakdown of the rewards earned over the `period_secs` seconds
    /// ending at the current chain time.
    pub async fn strategy_rewards(
        &self,
        strategy: Address,
        period_secs: i64,
        cancel: &CancellationToken,
    ) -> Result<StrategyRewards, RewardError> {
        if period_secs <= 0 {
            return Err(WindowError::NonPositivePeriod(period_secs).into());
        }

        let now = self
            .guard
            .chain(cancel, || "current timestamp".to_string(), self.chain.current_timestamp())
            .await?;
        let window = Window::ending_at(now, period_secs)?;

        let positions = self.resolver.resolve_positions(strategy, cancel).await?;
        tracing::debug!(
            "[RewardCalculator] {} holds {} position(s), window {}..{}",
            strategy.short(),
            positions.len(),
            window.start,
            window.end
        );

        let positions: Vec<PositionRewards> = stream::iter(positions)
            .map(|position| async move {
                if cancel.is_cancelled() {
                    return Err(RewardError::Cancelled);
                }
                let events = self
                    .accumulator
                    .accrue_rewards(&position, window.start, window.end, cancel)
                    .await?;
                Ok(PositionRewards { position, events })
            })
            .buffered(self.config.concurrency())
            .try_collect()
            .await?;

        let events: Vec<RewardEvent> = positions
            .iter()
            .flat_map(|p| p.events.iter().copied())
            .collect();
        let valued = self.valuation.value_usd(&events, cancel).await?;

        Ok(StrategyRewards {
            strategy,
            window,
            positions,
            total_usd: valued.value,
            warnings: valued.warnings,
        })
    }
}
