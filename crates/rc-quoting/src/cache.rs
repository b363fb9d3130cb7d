use std::time::Duration;

use moka::future::Cache;
use rust_decimal::Decimal;

use rewardcalc_types::Address;

use crate::{OracleError, PriceOracle};

/// Wraps an oracle with a TTL cache keyed by token and time bucket.
///
/// Two queries for the same token whose timestamps fall in the same bucket share
/// one upstream request. Errors are never cached.
pub struct CachedOracle<O> {
    inner: O,
    bucket_secs: u64,
    cache: Cache<(Address, u64), Option<Decimal>>,
}

impl<O: PriceOracle> CachedOracle<O> {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);
    pub const DEFAULT_BUCKET_SECS: u64 = 60;

    pub fn new(inner: O) -> Self {
        Self::with_settings(inner, Self::DEFAULT_TTL, Self::DEFAULT_BUCKET_SECS)
    }

    pub fn with_settings(inner: O, ttl: Duration, bucket_secs: u64) -> Self {
        Self {
            inner,
            bucket_secs: bucket_secs.max(1),
            cache: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(10_000)
                .build(),
        }
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }
}

#[async_trait::async_trait]
impl<O: PriceOracle> PriceOracle for CachedOracle<O> {
    async fn usd_price(&self, token: Address, at: u64) -> Result<Option<Decimal>, OracleError> {
        let bucket = at / self.bucket_secs;
        let key = (token, bucket);

        if let Some(cached_price) = self.cache.get(&key).await {
            return Ok(cached_price);
        }

        // Query at the bucket start so every caller sharing the entry sees the same price.
        let price = self
            .inner
            .usd_price(token, bucket * self.bucket_secs)
            .await?;
        self.cache.insert(key, price).await;
        Ok(price)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rust_decimal::dec;

    use super::*;

    #[derive(Default)]
    struct CountingOracle {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl PriceOracle for CountingOracle {
        async fn usd_price(&self, token: Address, at: u64) -> Result<Option<Decimal>, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if token == Address::from(0xdead) {
                return Err(OracleError::Unavailable("down".to_string()));
            }
            Ok(Some(Decimal::from(at)))
        }
    }

    #[tokio::test]
    async fn test_same_bucket_hits_cache() {
        let oracle = CachedOracle::with_settings(
            CountingOracle::default(),
            Duration::from_secs(60),
            100,
        );
        let token = Address::from(1);

        assert_eq!(oracle.usd_price(token, 1_050).await.unwrap(), Some(dec!(1000)));
        assert_eq!(oracle.usd_price(token, 1_099).await.unwrap(), Some(dec!(1000)));
        assert_eq!(oracle.inner().calls.load(Ordering::SeqCst), 1);

        assert_eq!(oracle.usd_price(token, 1_100).await.unwrap(), Some(dec!(1100)));
        assert_eq!(oracle.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let oracle = CachedOracle::new(CountingOracle::default());
        let token = Address::from(0xdead);

        assert!(oracle.usd_price(token, 0).await.is_err());
        assert!(oracle.usd_price(token, 0).await.is_err());
        assert_eq!(oracle.inner().calls.load(Ordering::SeqCst), 2);
    }
}
