//! Runs the engine over the bundled demo snapshot.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use rewardcalc_chain::{Bookkeeper, SnapshotChain};
use rewardcalc_kpi::{KpiEngine, ScanOutcome, SkipReason};
use rewardcalc_quoting::StaticPrices;
use rewardcalc_rewards::{CalculatorConfig, RewardCalculator};
use rewardcalc_types::{Address, Ratio, Usd};

const DEMOS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../demos");

async fn demo_engine() -> (Arc<SnapshotChain>, KpiEngine) {
    let chain = Arc::new(
        SnapshotChain::load(format!("{DEMOS}/snapshot.json"))
            .await
            .unwrap(),
    );
    let prices = StaticPrices::load(format!("{DEMOS}/prices.json"))
        .await
        .unwrap();
    let calculator =
        RewardCalculator::new(chain.clone(), Arc::new(prices), CalculatorConfig::default());
    (chain, KpiEngine::new(Arc::new(calculator)))
}

#[tokio::test]
async fn test_demo_vault_kpi() {
    let (_, engine) = demo_engine().await;

    let kpi = engine
        .kpi(Address::from(0x71), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(kpi.value, "0.02".parse::<Ratio>().unwrap());
}

#[tokio::test]
async fn test_demo_scan() {
    let (chain, engine) = demo_engine().await;
    let registry = chain
        .snapshot()
        .await
        .unwrap()
        .with_excluded(["NoopStrategy"]);

    let report = engine
        .scan(&registry, 86_400, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!((report.computed, report.skipped, report.failed), (2, 1, 0));
    assert_eq!(report.total_rewards_usd, "23.0".parse::<Usd>().unwrap());
    assert_eq!(
        report.entries[2].outcome,
        ScanOutcome::Skipped {
            reason: SkipReason::Excluded
        }
    );
    assert!(matches!(
        &report.entries[1].outcome,
        ScanOutcome::Computed { kpi, .. } if *kpi == "0.03".parse::<Ratio>().unwrap()
    ));
}
