use std::sync::Arc;

use opentelemetry::{KeyValue, global, metrics::Counter};

const METER_NAME: &str = "rewardcalc";

#[derive(Debug)]
pub struct MetricsRegistry {
    pub scans: Arc<ScanMetrics>,
    pub valuations: Arc<ValuationMetrics>,
}

impl MetricsRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            scans: ScanMetrics::new(),
            valuations: ValuationMetrics::new(),
        })
    }
}

#[derive(Debug)]
pub struct ScanMetrics {
    vaults_computed: Counter<u64>,
    vaults_skipped: Counter<u64>,
    vaults_failed: Counter<u64>,
}

impl ScanMetrics {
    fn new() -> Arc<Self> {
        let meter = global::meter(METER_NAME);
        let vaults_computed = meter
            .u64_counter("scan_vaults_computed_total")
            .with_description("Number of vaults whose KPI was computed during a scan")
            .with_unit("count")
            .init();

        let vaults_skipped = meter
            .u64_counter("scan_vaults_skipped_total")
            .with_description("Number of vaults skipped during a scan")
            .with_unit("count")
            .init();

        let vaults_failed = meter
            .u64_counter("scan_vaults_failed_total")
            .with_description("Number of vaults whose KPI computation failed during a scan")
            .with_unit("count")
            .init();

        Arc::new(Self {
            vaults_computed,
            vaults_skipped,
            vaults_failed,
        })
    }

    pub fn record_computed(&self, platform: &str) {
        self.vaults_computed
            .add(1, &[KeyValue::new("platform", platform.to_string())]);
    }

    pub fn record_skipped(&self, reason: &'static str) {
        self.vaults_skipped.add(1, &[KeyValue::new("reason", reason)]);
    }

    pub fn record_failed(&self, error_kind: &'static str) {
        self.vaults_failed
            .add(1, &[KeyValue::new("error", error_kind)]);
    }
}

#[derive(Debug)]
pub struct ValuationMetrics {
    warnings: Counter<u64>,
}

impl ValuationMetrics {
    fn new() -> Arc<Self> {
        let warnings = global::meter(METER_NAME)
            .u64_counter("valuation_warnings_total")
            .with_description("Number of tokens left out of a USD total")
            .with_unit("count")
            .init();

        Arc::new(Self { warnings })
    }

    pub fn record_warning(&self, kind: &'static str, token: &str) {
        self.warnings.add(
            1,
            &[
                KeyValue::new("kind", kind),
                KeyValue::new("token", token.to_string()),
            ],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_a_provider_is_a_noop() {
        let metrics = MetricsRegistry::new();
        metrics.scans.record_computed("amm_lp");
        metrics.scans.record_skipped("excluded");
        metrics.scans.record_failed("data_unavailable");
        metrics.valuations.record_warning("missing_price", "0x1");
    }
}
