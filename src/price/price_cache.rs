use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

use super::feed::PriceFeed;
use crate::error::AppResult;

/// Last good price with the time it was fetched
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPrice {
    pub price: Decimal,
    pub fetched_at: DateTime<Utc>,
}

impl CachedPrice {
    pub fn age_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.fetched_at).num_seconds()
    }
}

/// Advisory USD price.
///
/// Reads are synchronous and never wait on the network; a failed refresh
/// keeps the previous value.
pub struct PriceCache {
    feed: Arc<dyn PriceFeed>,
    latest: RwLock<Option<CachedPrice>>,
}

impl PriceCache {
    pub fn new(feed: Arc<dyn PriceFeed>) -> Self {
        Self {
            feed,
            latest: RwLock::new(None),
        }
    }

    /// Current price, if one has ever been fetched
    pub fn get(&self) -> Option<CachedPrice> {
        self.latest.read().clone()
    }

    pub fn price(&self) -> Option<Decimal> {
        self.get().map(|c| c.price)
    }

    /// Fetch a fresh price and store it
    pub async fn refresh(&self) -> AppResult<CachedPrice> {
        match self.feed.usd_price().await {
            Ok(price) => {
                let entry = CachedPrice {
                    price,
                    fetched_at: Utc::now(),
                };
                *self.latest.write() = Some(entry.clone());
                debug!("💾 Cached {} price = {}", self.feed.currency_id(), price);
                Ok(entry)
            }
            Err(e) => {
                if self.latest.read().is_some() {
                    warn!("⚠ Price refresh failed, keeping previous value: {}", e);
                } else {
                    warn!("⚠ Price refresh failed, USD values hidden: {}", e);
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::UpstreamError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;

    /// Feed that returns queued results in order
    pub(crate) struct ScriptedFeed {
        results: Mutex<Vec<Option<Decimal>>>,
    }

    impl ScriptedFeed {
        pub(crate) fn new(results: Vec<Option<Decimal>>) -> Self {
            Self {
                results: Mutex::new(results.into_iter().rev().collect()),
            }
        }
    }

    #[async_trait]
    impl PriceFeed for ScriptedFeed {
        fn currency_id(&self) -> &str {
            "ethereum"
        }

        async fn usd_price(&self) -> AppResult<Decimal> {
            match self.results.lock().pop().flatten() {
                Some(price) => Ok(price),
                None => Err(UpstreamError::PriceUnavailable("scripted failure".to_string()).into()),
            }
        }
    }

    #[tokio::test]
    async fn test_price_cache() {
        let cache = PriceCache::new(Arc::new(ScriptedFeed::new(vec![Some(dec!(3000))])));
        assert!(cache.price().is_none());

        cache.refresh().await.unwrap();
        assert_eq!(cache.price(), Some(dec!(3000)));
        assert_eq!(cache.get().map(|c| c.price), Some(dec!(3000)));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous() {
        let cache = PriceCache::new(Arc::new(ScriptedFeed::new(vec![Some(dec!(2500)), None])));

        cache.refresh().await.unwrap();
        assert!(cache.refresh().await.is_err());
        assert_eq!(cache.price(), Some(dec!(2500)));
    }

    #[tokio::test]
    async fn test_failed_first_refresh_leaves_price_unknown() {
        let cache = PriceCache::new(Arc::new(ScriptedFeed::new(vec![None])));
        assert!(cache.refresh().await.is_err());
        assert!(cache.price().is_none());
    }
}
