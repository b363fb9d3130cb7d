//! Vault KPI: USD rewards earned by the vault's strategy over the reference
//! period, divided by the USD value deposited in the vault.

mod engine;
mod scan;

pub use engine::{KpiEngine, VaultKpi};
pub use scan::{ScanEntry, ScanOutcome, ScanReport, SkipReason};
