use std::{collections::HashMap, path::Path};

use dashmap::DashMap;
use rust_decimal::Decimal;

use rewardcalc_types::Address;

use crate::{OracleError, PriceOracle};

/// Fixed USD prices, the same at every point in time.
#[derive(Clone, Default, Debug)]
pub struct StaticPrices(DashMap<Address, Decimal>);

impl StaticPrices {
    pub fn get(&self, token: Address) -> Option<Decimal> {
        self.0.get(&token).map(|v| *v.value())
    }

    /// Negative prices are rejected and return `None`.
    pub fn insert(&self, token: Address, price: Decimal) -> Option<Decimal> {
        if price.is_sign_negative() {
            return None;
        }
        self.0.insert(token, price)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Loads a JSON object of `{ "<token address>": "<usd price>" }`.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, OracleError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| OracleError::Unavailable(format!("{}: {e}", path.display())))?;
        let table: HashMap<Address, Decimal> =
            serde_json::from_str(&raw).map_err(|e| OracleError::Malformed(e.to_string()))?;

        let prices = Self::default();
        for (token, price) in table {
            if price.is_sign_negative() {
                tracing::warn!("[StaticPrices] 🚫 Ignoring negative price {price} for {token}");
                continue;
            }
            prices.insert(token, price);
        }
        tracing::info!(
            "[StaticPrices] 💵 Loaded {} prices from {}",
            prices.len(),
            path.display()
        );
        Ok(prices)
    }
}

#[async_trait::async_trait]
impl PriceOracle for StaticPrices {
    async fn usd_price(&self, token: Address, _at: u64) -> Result<Option<Decimal>, OracleError> {
        Ok(self.get(token))
    }
}

// Utils implementation to easily spin up StaticPrices (in tests mainly).
impl From<Vec<(Address, Decimal)>> for StaticPrices {
    fn from(pairs: Vec<(Address, Decimal)>) -> Self {
        let prices = Self::default();
        for (token, price) in pairs {
            prices.insert(token, price);
        }
        prices
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::dec;

    use super::*;

    #[tokio::test]
    async fn test_static_prices() {
        let prices = StaticPrices::from(vec![
            (Address::from(1), dec!(2)),
            (Address::from(2), dec!(-1)),
        ]);

        assert_eq!(prices.usd_price(Address::from(1), 0).await.unwrap(), Some(dec!(2)));
        assert_eq!(prices.usd_price(Address::from(1), 99).await.unwrap(), Some(dec!(2)));
        assert_eq!(prices.usd_price(Address::from(2), 0).await.unwrap(), None);
        assert_eq!(prices.usd_price(Address::from(3), 0).await.unwrap(), None);
    }
}
