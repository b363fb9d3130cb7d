use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt, stream};
use serde::Serialize;
use strum::{Display, IntoStaticStr};
use tokio_util::sync::CancellationToken;

use rewardcalc_chain::RegistrySnapshot;
use rewardcalc_metrics::MetricsRegistry;
use rewardcalc_rewards::RewardError;
use rewardcalc_types::{Address, DataWarning, Platform, Ratio, Usd};

use crate::engine::KpiEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    Inactive,
    Excluded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
    Computed {
        strategy: Address,
        strategy_name: String,
        platform: Platform,
        rewards_usd: Usd,
        deposited_usd: Usd,
        kpi: Ratio,
        warnings: Vec<DataWarning>,
    },
    Skipped {
        reason: SkipReason,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanEntry {
    pub vault: Address,
    pub outcome: ScanOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub started_at: DateTime<Utc>,
    pub period_secs: i64,
    pub entries: Vec<ScanEntry>,
    pub total_rewards_usd: Usd,
    pub by_platform: BTreeMap<Platform, Usd>,
    pub computed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ScanReport {
    fn new(started_at: DateTime<Utc>, period_secs: i64, entries: Vec<ScanEntry>) -> Self {
        let mut report = Self {
            started_at,
            period_secs,
            entries: Vec::with_capacity(entries.len()),
            total_rewards_usd: Usd::ZERO,
            by_platform: BTreeMap::new(),
            computed: 0,
            skipped: 0,
            failed: 0,
        };

        for entry in entries {
            match &entry.outcome {
                ScanOutcome::Computed {
                    platform,
                    rewards_usd,
                    ..
                } => {
                    report.computed += 1;
                    report.total_rewards_usd = report.total_rewards_usd.saturating_add(*rewards_usd);
                    let slot = report.by_platform.entry(*platform).or_default();
                    *slot = slot.saturating_add(*rewards_usd);
                }
                ScanOutcome::Skipped { .. } => report.skipped += 1,
                ScanOutcome::Failed { .. } => report.failed += 1,
            }
            report.entries.push(entry);
        }
        report
    }
}

impl KpiEngine {
    /// Computes every vault of `registry`, in registry order.
    ///
    /// A vault that fails is recorded as `Failed` and the scan moves on. Only
    /// cancellation aborts the whole scan.
    pub async fn scan(
        &self,
        registry: &RegistrySnapshot,
        period_secs: i64,
        cancel: &CancellationToken,
    ) -> Result<ScanReport, RewardError> {
        if period_secs <= 0 {
            return Err(RewardError::InvalidArgument(format!(
                "period must be positive, got {period_secs}"
            )));
        }

        let started_at = Utc::now();
        tracing::info!(
            "[KpiEngine] 🧮 Starting scan of {} vault(s) over {period_secs}s...",
            registry.vaults.len()
        );

        let entries: Vec<ScanEntry> = stream::iter(registry.vaults.iter().copied())
            .map(|vault| async move {
                if cancel.is_cancelled() {
                    return Err(RewardError::Cancelled);
                }
                let outcome = self.scan_vault(vault, registry, period_secs, cancel).await?;
                Ok(ScanEntry { vault, outcome })
            })
            .buffered(self.calculator.config().concurrency())
            .try_collect()
            .await?;

        let report = ScanReport::new(started_at, period_secs, entries);
        let duration = Utc::now() - started_at;
        tracing::info!(
            "[KpiEngine] 🧮 Scan completed in {}ms. Computed: {}, Skipped: {}, Failed: {}, Rewards: {} USD",
            duration.num_milliseconds(),
            report.computed,
            report.skipped,
            report.failed,
            report.total_rewards_usd
        );

        Ok(report)
    }

    /// `Err` only on cancellation.
    async fn scan_vault(
        &self,
        vault: Address,
        registry: &RegistrySnapshot,
        period_secs: i64,
        cancel: &CancellationToken,
    ) -> Result<ScanOutcome, RewardError> {
        match self.try_scan_vault(vault, registry, period_secs, cancel).await {
            Ok(outcome) => {
                match &outcome {
                    ScanOutcome::Computed { platform, .. } => {
                        self.record(|m| m.scans.record_computed(platform.as_ref()));
                    }
                    ScanOutcome::Skipped { reason } => {
                        tracing::debug!("[KpiEngine] skipping vault {}: {reason}", vault.short());
                        self.record(|m| m.scans.record_skipped((*reason).into()));
                    }
                    ScanOutcome::Failed { .. } => {}
                }
                Ok(outcome)
            }
            Err(RewardError::Cancelled) => Err(RewardError::Cancelled),
            Err(e) => {
                tracing::warn!("[KpiEngine] 🔴 Failed to compute KPI for vault {vault}: {e}");
                self.record(|m| m.scans.record_failed(e.kind()));
                Ok(ScanOutcome::Failed {
                    error: e.to_string(),
                })
            }
        }
    }

    async fn try_scan_vault(
        &self,
        vault: Address,
        registry: &RegistrySnapshot,
        period_secs: i64,
        cancel: &CancellationToken,
    ) -> Result<ScanOutcome, RewardError> {
        let info = self.vault_info(vault, cancel).await?;
        if !info.active {
            return Ok(ScanOutcome::Skipped {
                reason: SkipReason::Inactive,
            });
        }

        let strategy = self
            .calculator
            .guard()
            .chain(
                cancel,
                || format!("strategy {}", info.strategy),
                self.calculator.chain().strategy(info.strategy),
            )
            .await?
            .ok_or_else(|| {
                RewardError::unavailable(format!("strategy {}", info.strategy), "not deployed")
            })?;
        if registry.is_excluded(&strategy.name) {
            return Ok(ScanOutcome::Skipped {
                reason: SkipReason::Excluded,
            });
        }

        let computed = self.vault_kpi(&info, period_secs, cancel).await?;
        Ok(ScanOutcome::Computed {
            strategy: strategy.address,
            strategy_name: strategy.name,
            platform: strategy.platform,
            rewards_usd: computed.rewards.total_usd,
            deposited_usd: computed.deposited_usd,
            kpi: computed.kpi.value,
            warnings: computed.kpi.warnings,
        })
    }

    fn record(&self, f: impl FnOnce(&MetricsRegistry)) {
        if let Some(metrics) = &self.metrics {
            f(metrics);
        }
    }
}
