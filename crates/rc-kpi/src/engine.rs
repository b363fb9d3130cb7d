use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use rewardcalc_chain::VaultInfo;
use rewardcalc_metrics::MetricsRegistry;
use rewardcalc_rewards::{RewardCalculator, RewardError, StrategyRewards};
use rewardcalc_types::{
    Address, DataWarning, PartialResult, Ratio, RewardEvent, Usd, WarningKind,
};

/// Rewards, deposits and their ratio for one vault over one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultKpi {
    pub vault: Address,
    pub rewards: StrategyRewards,
    pub deposited_usd: Usd,
    pub kpi: PartialResult<Ratio>,
}

/// Reward yield of vaults: USD rewarded over the reference period divided by
/// the USD value deposited.
pub struct KpiEngine {
    pub(crate) calculator: Arc<RewardCalculator>,
    pub(crate) metrics: Option<Arc<MetricsRegistry>>,
}

impl KpiEngine {
    pub const fn new(calculator: Arc<RewardCalculator>) -> Self {
        Self {
            calculator,
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn calculator(&self) -> &RewardCalculator {
        &self.calculator
    }

    /// KPI of `vault` over the configured reference period.
    ///
    /// Inactive vaults have a KPI of zero.
    pub async fn kpi(
        &self,
        vault: Address,
        cancel: &CancellationToken,
    ) -> Result<PartialResult<Ratio>, RewardError> {
        let info = self.vault_info(vault, cancel).await?;
        if !info.active {
            tracing::debug!("[KpiEngine] vault {} is inactive", info.name);
            return Ok(PartialResult::complete(Ratio::ZERO));
        }

        let period = self.calculator.config().reference_period_secs;
        Ok(self.vault_kpi(&info, period, cancel).await?.kpi)
    }

    pub(crate) async fn vault_info(
        &self,
        vault: Address,
        cancel: &CancellationToken,
    ) -> Result<VaultInfo, RewardError> {
        self.calculator
            .guard()
            .chain(
                cancel,
                || format!("vault {vault}"),
                self.calculator.chain().vault(vault),
            )
            .await?
            .ok_or_else(|| RewardError::InvalidArgument(format!("{vault} is not a vault")))
    }

    /// Full breakdown for an active vault.
    pub async fn vault_kpi(
        &self,
        info: &VaultInfo,
        period_secs: i64,
        cancel: &CancellationToken,
    ) -> Result<VaultKpi, RewardError> {
        let rewards = self
            .calculator
            .strategy_rewards(info.strategy, period_secs, cancel)
            .await?;

        // Deposits are valued like a reward of the whole underlying at window end.
        let deposits = [RewardEvent {
            token: info.underlying,
            amount: info.total_assets,
            at: rewards.window.end,
        }];
        let deposited = self
            .calculator
            .valuation()
            .value_usd(&deposits, cancel)
            .await?;

        let mut warnings = rewards.warnings.clone();
        warnings.extend(deposited.warnings);
        let ratio = Ratio::of(rewards.total_usd, deposited.value).unwrap_or_else(|| {
            tracing::warn!(
                "[KpiEngine] ⚠️ kpi of vault {} overflows ({} USD on {} USD deposited)",
                info.name,
                rewards.total_usd,
                deposited.value
            );
            warnings.push(DataWarning::new(info.address, WarningKind::Overflow));
            Ratio::ZERO
        });

        tracing::debug!(
            "[KpiEngine] vault {}: {} USD rewarded on {} USD deposited, kpi {}",
            info.name,
            rewards.total_usd,
            deposited.value,
            ratio
        );

        Ok(VaultKpi {
            vault: info.address,
            rewards,
            deposited_usd: deposited.value,
            kpi: PartialResult::with_warnings(ratio, warnings),
        })
    }
}
