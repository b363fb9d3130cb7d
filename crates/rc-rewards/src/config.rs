use std::time::Duration;

use rewardcalc_types::ONE_DAY_SECS;

/// Runtime knobs shared by every reward and KPI computation.
#[derive(Debug, Clone)]
pub struct CalculatorConfig {
    /// Upper bound for any single chain or oracle query.
    pub query_timeout: Duration,
    /// How many sub-queries (positions, tokens, vaults) may be in flight at once.
    pub max_concurrent_queries: usize,
    /// Window used by the KPI engine.
    pub reference_period_secs: i64,
}

impl CalculatorConfig {
    pub fn concurrency(&self) -> usize {
        self.max_concurrent_queries.max(1)
    }
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(10),
            max_concurrent_queries: 8,
            reference_period_secs: ONE_DAY_SECS,
        }
    }
}
