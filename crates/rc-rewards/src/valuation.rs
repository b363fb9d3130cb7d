use std::{collections::BTreeMap, sync::Arc};

use futures::{StreamExt, TryStreamExt, stream};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

use rewardcalc_chain::{ChainError, ChainStateReader};
use rewardcalc_metrics::MetricsRegistry;
use rewardcalc_quoting::{OracleError, PriceOracle};
use rewardcalc_types::{Address, DataWarning, PartialResult, RewardEvent, Token, Usd, WarningKind};

use crate::{
    error::RewardError,
    query::{Interrupted, QueryGuard},
};

type Valued = Result<Usd, DataWarning>;

/// Converts raw token amounts into a single USD total.
///
/// Tokens that cannot be priced contribute zero and are reported as warnings
/// instead of failing the whole valuation.
pub struct ValuationEngine {
    chain: Arc<dyn ChainStateReader>,
    oracle: Arc<dyn PriceOracle>,
    guard: QueryGuard,
    concurrency: usize,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl ValuationEngine {
    pub fn new(
        chain: Arc<dyn ChainStateReader>,
        oracle: Arc<dyn PriceOracle>,
        guard: QueryGuard,
        concurrency: usize,
    ) -> Self {
        Self {
            chain,
            oracle,
            guard,
            concurrency: concurrency.max(1),
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn value_usd(
        &self,
        events: &[RewardEvent],
        cancel: &CancellationToken,
    ) -> Result<PartialResult<Usd>, RewardError> {
        // One price and one decimals lookup per distinct (token, timestamp).
        // `None` marks an amount that no longer fits a u128.
        let mut amounts: BTreeMap<(Address, u64), Option<u128>> = BTreeMap::new();
        for event in events {
            let slot = amounts.entry((event.token, event.at)).or_insert(Some(0));
            *slot = slot.and_then(|sum| sum.checked_add(event.amount));
        }

        let mut warnings = Vec::new();
        let amounts: Vec<((Address, u64), u128)> = amounts
            .into_iter()
            .filter_map(|(key, amount)| {
                if amount.is_none() {
                    warnings.push(self.warn(DataWarning::new(key.0, WarningKind::Overflow)));
                }
                amount.map(|amount| (key, amount))
            })
            .collect();
        if amounts.is_empty() {
            return Ok(PartialResult::with_warnings(Usd::ZERO, warnings));
        }

        let valued: Vec<(Address, Valued)> = stream::iter(amounts)
            .map(|((token, at), amount)| async move {
                self.value_token(token, at, amount, cancel)
                    .await
                    .map(|v| (token, v))
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let mut total = Usd::ZERO;
        for (token, contribution) in valued {
            match contribution {
                Ok(usd) => match total.checked_add(usd) {
                    Some(sum) => total = sum,
                    None => warnings.push(self.warn(DataWarning::new(token, WarningKind::Overflow))),
                },
                Err(warning) => warnings.push(warning),
            }
        }

        Ok(PartialResult::with_warnings(total, warnings))
    }

    /// `Err` only on cancellation; every other failure becomes a warning.
    async fn value_token(
        &self,
        token: Address,
        at: u64,
        amount: u128,
        cancel: &CancellationToken,
    ) -> Result<Valued, RewardError> {
        let (metadata, price) = tokio::join!(
            self.guard.run(cancel, self.chain.token(token)),
            self.guard.run(cancel, self.oracle.usd_price(token, at)),
        );
        if matches!(metadata, Err(Interrupted::Cancelled))
            || matches!(price, Err(Interrupted::Cancelled))
        {
            return Err(RewardError::Cancelled);
        }

        let decimals = match token_decimals(metadata) {
            Ok(decimals) => decimals,
            Err(kind) => return Ok(Err(self.warn(DataWarning::new(token, kind)))),
        };
        let price = match usd_price(price) {
            Ok(price) => price,
            Err(kind) => return Ok(Err(self.warn(DataWarning::new(token, kind)))),
        };

        Ok(Usd::of_token_amount(amount, decimals, price)
            .ok_or_else(|| self.warn(DataWarning::new(token, WarningKind::Overflow))))
    }

    fn warn(&self, warning: DataWarning) -> DataWarning {
        tracing::warn!("[ValuationEngine] ⚠️ {warning}");
        if let Some(metrics) = &self.metrics {
            metrics
                .valuations
                .record_warning(warning.kind.as_str(), &warning.subject.to_string());
        }
        warning
    }
}

fn token_decimals(
    metadata: Result<Result<Token, ChainError>, Interrupted>,
) -> Result<u8, WarningKind> {
    match metadata {
        Ok(Ok(token)) => Ok(token.decimals),
        Ok(Err(e)) => Err(WarningKind::TokenUnavailable(e.to_string())),
        Err(interrupted) => Err(WarningKind::TokenUnavailable(interrupted.describe())),
    }
}

fn usd_price(
    price: Result<Result<Option<Decimal>, OracleError>, Interrupted>,
) -> Result<Usd, WarningKind> {
    match price {
        Ok(Ok(Some(price))) if price.is_sign_negative() && !price.is_zero() => Err(
            WarningKind::OracleUnavailable(format!("negative price {price}")),
        ),
        Ok(Ok(Some(price))) => Usd::try_from_decimal(price).ok_or(WarningKind::Overflow),
        Ok(Ok(None)) => Err(WarningKind::MissingPrice),
        Ok(Err(e)) => Err(WarningKind::OracleUnavailable(e.to_string())),
        Err(interrupted) => Err(WarningKind::OracleUnavailable(interrupted.describe())),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rewardcalc_chain::SnapshotChain;
    use rewardcalc_quoting::StaticPrices;
    use rust_decimal::dec;

    use super::*;

    const WAD: u128 = 1_000_000_000_000_000_000;

    fn engine() -> ValuationEngine {
        let chain = SnapshotChain::new(1_700_000_000)
            .with_token(Address::from(1), 18)
            .with_token(Address::from(2), 18);
        let prices = StaticPrices::from(vec![
            (Address::from(1), dec!(1)),
            (Address::from(2), dec!(1)),
        ]);
        ValuationEngine::new(
            Arc::new(chain),
            Arc::new(prices),
            QueryGuard::new(Duration::from_secs(5)),
            4,
        )
    }

    fn event(token: u64, amount: u128) -> RewardEvent {
        RewardEvent {
            token: Address::from(token),
            amount,
            at: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn test_summed_amount_overflow_is_a_warning() {
        let events = [event(1, u128::MAX), event(1, 1), event(2, 3 * WAD)];

        let valued = engine()
            .value_usd(&events, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(valued.value.to_string(), "3.0");
        assert_eq!(
            valued.warnings,
            vec![DataWarning::new(Address::from(1), WarningKind::Overflow)]
        );
    }

    #[tokio::test]
    async fn test_only_overflowing_amounts_is_zero_with_warning() {
        let events = [event(1, u128::MAX), event(1, u128::MAX)];

        let valued = engine()
            .value_usd(&events, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(valued.value, Usd::ZERO);
        assert_eq!(valued.warnings.len(), 1);
        assert_eq!(valued.warnings[0].kind, WarningKind::Overflow);
    }

    #[test]
    fn test_usd_price_conversion() {
        assert_eq!(
            usd_price(Ok(Ok(Some(dec!(2.5))))).unwrap().to_string(),
            "2.5"
        );
        assert_eq!(usd_price(Ok(Ok(None))), Err(WarningKind::MissingPrice));
        assert!(matches!(
            usd_price(Ok(Ok(Some(dec!(-1))))),
            Err(WarningKind::OracleUnavailable(_))
        ));
        assert!(matches!(
            usd_price(Err(Interrupted::TimedOut(std::time::Duration::from_secs(1)))),
            Err(WarningKind::OracleUnavailable(reason)) if reason.contains("timed out")
        ));
    }

    #[test]
    fn test_token_decimals_failure_is_a_warning() {
        let res = token_decimals(Ok(Err(ChainError::not_found("token 0x1"))));
        assert!(matches!(res, Err(WarningKind::TokenUnavailable(_))));
    }
}
