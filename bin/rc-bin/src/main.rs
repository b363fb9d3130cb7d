use std::{collections::HashMap, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use url::Url;

use rewardcalc_chain::{Bookkeeper, SnapshotChain};
use rewardcalc_kpi::KpiEngine;
use rewardcalc_metrics::MetricsRegistry;
use rewardcalc_quoting::{CachedOracle, DEFAULT_HERMES_URL, PriceOracle, PythOracle, StaticPrices};
use rewardcalc_rewards::{CalculatorConfig, RewardCalculator};
use rewardcalc_types::{Address, ONE_DAY_SECS, PartialResult, Ratio};

#[derive(Parser, Debug)]
#[command(author, version, about = "Strategy reward and vault KPI calculator", long_about = None)]
struct Cli {
    /// Chain state snapshot (JSON) to compute against.
    #[arg(long, env = "REWARDCALC_SNAPSHOT")]
    snapshot: PathBuf,

    /// Static USD prices (JSON object of token address to price).
    #[arg(long, env = "REWARDCALC_PRICES", conflicts_with = "pyth_feeds")]
    prices: Option<PathBuf>,

    /// Pyth feed ids (JSON object of token address to feed id); prices are
    /// then fetched from Hermes.
    #[arg(long, env = "REWARDCALC_PYTH_FEEDS")]
    pyth_feeds: Option<PathBuf>,

    #[arg(long, env = "REWARDCALC_PYTH_URL", default_value = DEFAULT_HERMES_URL)]
    pyth_url: String,

    #[arg(long, env = "REWARDCALC_QUERY_TIMEOUT_SECS", default_value_t = 10)]
    query_timeout_secs: u64,

    #[arg(long, env = "REWARDCALC_MAX_CONCURRENCY", default_value_t = 8)]
    max_concurrency: usize,

    #[arg(long, env = "REWARDCALC_REFERENCE_PERIOD_SECS", default_value_t = ONE_DAY_SECS)]
    reference_period_secs: i64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// USD value of the rewards a strategy earned over a trailing period.
    StrategyRewards {
        #[arg(long)]
        strategy: Address,
        #[arg(long, default_value_t = ONE_DAY_SECS, allow_negative_numbers = true)]
        period: i64,
    },
    /// Reward KPI of a vault over the reference period.
    Kpi {
        #[arg(long)]
        vault: Address,
    },
    /// KPI of every vault in the snapshot registry.
    Scan {
        #[arg(long, default_value_t = ONE_DAY_SECS)]
        period: i64,
        /// Strategy names never scanned.
        #[arg(long, value_delimiter = ',', default_value = "NoopStrategy")]
        exclude: Vec<String>,
    },
}

#[derive(Serialize)]
struct KpiOutput {
    vault: Address,
    kpi: PartialResult<Ratio>,
}

fn init_logger() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

impl Cli {
    fn config(&self) -> CalculatorConfig {
        CalculatorConfig {
            query_timeout: Duration::from_secs(self.query_timeout_secs),
            max_concurrent_queries: self.max_concurrency,
            reference_period_secs: self.reference_period_secs,
        }
    }

    async fn oracle(&self) -> Result<Arc<dyn PriceOracle>> {
        if let Some(path) = &self.prices {
            let prices = StaticPrices::load(path)
                .await
                .with_context(|| format!("Failed to load prices from {}", path.display()))?;
            return Ok(Arc::new(prices));
        }

        let Some(path) = &self.pyth_feeds else {
            bail!("Either --prices or --pyth-feeds must be provided");
        };
        let raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read Pyth feeds from {}", path.display()))?;
        let feeds: HashMap<Address, String> =
            serde_json::from_slice(&raw).context("Invalid Pyth feeds file")?;
        let base_url = Url::parse(&self.pyth_url).context("Invalid Pyth URL")?;

        let pyth = PythOracle::new(base_url, feeds, Duration::from_secs(self.query_timeout_secs))
            .context("Failed to create Pyth client")?;
        Ok(Arc::new(CachedOracle::new(pyth)))
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_logger();

    let cli = Cli::parse();

    let chain = SnapshotChain::load(&cli.snapshot)
        .await
        .with_context(|| format!("Failed to load snapshot {}", cli.snapshot.display()))?;
    let chain = Arc::new(chain);
    let oracle = cli.oracle().await?;
    let metrics = MetricsRegistry::new();

    let calculator = Arc::new(
        RewardCalculator::new(chain.clone(), oracle, cli.config()).with_metrics(metrics.clone()),
    );

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("🛑 Interrupted, cancelling...");
            on_ctrl_c.cancel();
        }
    });

    match cli.command {
        Command::StrategyRewards { strategy, period } => {
            let rewards = calculator
                .strategy_rewards(strategy, period, &cancel)
                .await
                .context("Failed to compute strategy rewards")?;
            print_json(&rewards)?;
        }
        Command::Kpi { vault } => {
            let kpi = KpiEngine::new(calculator)
                .with_metrics(metrics)
                .kpi(vault, &cancel)
                .await
                .context("Failed to compute vault KPI")?;
            print_json(&KpiOutput { vault, kpi })?;
        }
        Command::Scan { period, exclude } => {
            let registry = chain
                .snapshot()
                .await
                .context("Failed to read the vault registry")?
                .with_excluded(exclude);
            let report = KpiEngine::new(calculator)
                .with_metrics(metrics)
                .scan(&registry, period, &cancel)
                .await
                .context("Scan failed")?;
            print_json(&report)?;
        }
    }

    Ok(())
}
