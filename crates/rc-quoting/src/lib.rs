mod cache;
mod pyth;
mod static_prices;

use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;

use rewardcalc_types::Address;

pub use cache::CachedOracle;
pub use pyth::{DEFAULT_HERMES_URL, PythOracle};
pub use static_prices::StaticPrices;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed oracle response: {0}")]
    Malformed(String),

    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

/// USD price of a token at a point in chain history.
#[async_trait::async_trait]
pub trait PriceOracle: Send + Sync {
    /// Price of one whole token in USD at unix time `at`.
    /// `Ok(None)` means the oracle has no price for it.
    async fn usd_price(&self, token: Address, at: u64) -> Result<Option<Decimal>, OracleError>;
}

#[async_trait::async_trait]
impl<O: PriceOracle + ?Sized> PriceOracle for Arc<O> {
    async fn usd_price(&self, token: Address, at: u64) -> Result<Option<Decimal>, OracleError> {
        (**self).usd_price(token, at).await
    }
}
