//! Strategy reward accounting: which positions a strategy holds, what they
//! earned over a window, and what that is worth in USD.

pub mod accumulator;
pub mod calculator;
pub mod config;
pub mod error;
pub mod query;
pub mod resolver;
pub mod valuation;

pub use accumulator::RewardAccumulator;
pub use calculator::{PositionRewards, RewardCalculator, StrategyRewards};
pub use config::CalculatorConfig;
pub use error::RewardError;
pub use query::{Interrupted, QueryGuard};
pub use resolver::PositionResolver;
pub use valuation::ValuationEngine;
