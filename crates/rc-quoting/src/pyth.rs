use std::{collections::HashMap, time::Duration};

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use url::Url;

use rewardcalc_types::Address;

use crate::{OracleError, PriceOracle};

pub const DEFAULT_HERMES_URL: &str = "https://hermes.pyth.network";

// Pyth response structures
#[derive(Debug, Deserialize)]
struct PythResponse {
    parsed: Vec<PriceFeed>,
}

#[derive(Debug, Deserialize)]
struct PriceFeed {
    id: String,
    price: PriceData,
}

#[derive(Debug, Deserialize)]
struct PriceData {
    price: String,
    expo: i32,
}

/// Historical USD prices from the Pyth Hermes API.
///
/// Only tokens with a configured feed id are priced; every other token is reported
/// as having no price.
#[derive(Debug, Clone)]
pub struct PythOracle {
    client: reqwest::Client,
    base_url: Url,
    feeds: HashMap<Address, String>,
}

impl PythOracle {
    pub fn new(
        base_url: Url,
        feeds: HashMap<Address, String>,
        timeout: Duration,
    ) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let feeds = feeds
            .into_iter()
            .map(|(token, id)| (token, normalize_feed_id(&id).to_string()))
            .collect();
        Ok(Self {
            client,
            base_url,
            feeds,
        })
    }

    fn price_url(&self, feed_id: &str, at: u64) -> Result<Url, OracleError> {
        let mut url = self
            .base_url
            .join(&format!("v2/updates/price/{at}"))
            .map_err(|e| OracleError::Malformed(format!("bad Hermes url: {e}")))?;
        url.query_pairs_mut()
            .append_pair("ids[]", feed_id)
            .append_pair("parsed", "true");
        Ok(url)
    }
}

#[async_trait::async_trait]
impl PriceOracle for PythOracle {
    async fn usd_price(&self, token: Address, at: u64) -> Result<Option<Decimal>, OracleError> {
        let Some(feed_id) = self.feeds.get(&token) else {
            tracing::debug!("[PythOracle] No feed configured for {token}");
            return Ok(None);
        };

        let url = self.price_url(feed_id, at)?;
        let response = self.client.get(url).send().await?;

        // Hermes answers 404 when it has no update published at that time.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let pyth_response: PythResponse = response.error_for_status()?.json().await?;

        let Some(price_feed) = pyth_response
            .parsed
            .iter()
            .find(|feed| normalize_feed_id(&feed.id) == feed_id.as_str())
        else {
            return Ok(None);
        };

        let price = scaled_price(&price_feed.price.price, price_feed.price.expo)?;
        Ok(Some(price))
    }
}

fn normalize_feed_id(id: &str) -> &str {
    id.trim_start_matches("0x")
}

/// `price * 10^expo`.
fn scaled_price(price: &str, expo: i32) -> Result<Decimal, OracleError> {
    let price_int: i64 = price
        .parse()
        .map_err(|e| OracleError::Malformed(format!("price '{price}': {e}")))?;
    if price_int < 0 {
        return Err(OracleError::Malformed(format!("negative price {price_int}")));
    }

    if expo <= 0 {
        Decimal::try_from_i128_with_scale(i128::from(price_int), expo.unsigned_abs())
            .map_err(|e| OracleError::Malformed(format!("exponent {expo}: {e}")))
    } else {
        let factor = 10_i64
            .checked_pow(expo.unsigned_abs())
            .ok_or_else(|| OracleError::Malformed(format!("exponent {expo} too large")))?;
        Decimal::from(price_int)
            .checked_mul(Decimal::from(factor))
            .ok_or_else(|| OracleError::Malformed(format!("price {price_int}e{expo} overflows")))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::dec;

    use super::*;

    #[test]
    fn test_scaled_price() {
        assert_eq!(scaled_price("99985000", -8).unwrap(), dec!(0.99985));
        assert_eq!(scaled_price("12", 2).unwrap(), dec!(1200));
        assert_eq!(scaled_price("7", 0).unwrap(), dec!(7));
        assert!(scaled_price("-1", -8).is_err());
        assert!(scaled_price("abc", -8).is_err());
    }

    #[test]
    fn test_price_url() {
        let oracle = PythOracle::new(
            Url::parse(DEFAULT_HERMES_URL).unwrap(),
            HashMap::from([(Address::from(1), "0xeaa0".to_string())]),
            Duration::from_secs(5),
        )
        .unwrap();

        let url = oracle.price_url("eaa0", 1_700_000_000).unwrap();
        assert_eq!(
            url.as_str(),
            "https://hermes.pyth.network/v2/updates/price/1700000000?ids%5B%5D=eaa0&parsed=true"
        );
        assert_eq!(oracle.feeds.get(&Address::from(1)).unwrap(), "eaa0");
    }

    #[tokio::test]
    async fn test_unknown_token_has_no_price() {
        let oracle = PythOracle::new(
            Url::parse(DEFAULT_HERMES_URL).unwrap(),
            HashMap::new(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(oracle.usd_price(Address::from(1), 0).await.unwrap(), None);
    }
}
