use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use tracing::info;

use crate::error::{AppResult, UpstreamError};

/// Source of the USD price of the native currency
#[async_trait]
pub trait PriceFeed: Send + Sync {
    fn currency_id(&self) -> &str;

    async fn usd_price(&self) -> AppResult<Decimal>;
}

/// CoinGecko `simple/price` client
///
/// Response shape: `{ "ethereum": { "usd": 3051.27 } }`
pub struct CoinGeckoFeed {
    client: Client,
    base_url: String,
    currency_id: String,
}

impl CoinGeckoFeed {
    pub fn new(base_url: impl Into<String>, currency_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            currency_id: currency_id.into(),
        }
    }
}

/// Pull `body[currency_id].usd` out of a price document
pub fn extract_usd(body: &Value, currency_id: &str) -> Result<Decimal, UpstreamError> {
    let raw = body
        .get(currency_id)
        .and_then(|c| c.get("usd"))
        .ok_or_else(|| {
            UpstreamError::PriceUnavailable(format!("no usd price for '{}'", currency_id))
        })?;

    // Parse through the textual form to avoid binary float artefacts
    let price = match raw {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .map_err(|e| UpstreamError::PriceUnavailable(e.to_string()))?,
        Value::String(s) => {
            Decimal::from_str(s).map_err(|e| UpstreamError::PriceUnavailable(e.to_string()))?
        }
        other => {
            return Err(UpstreamError::PriceUnavailable(format!(
                "unexpected price value {}",
                other
            )))
        }
    };

    if price <= Decimal::ZERO {
        return Err(UpstreamError::PriceUnavailable(format!(
            "non-positive price {}",
            price
        )));
    }
    Ok(price)
}

#[async_trait]
impl PriceFeed for CoinGeckoFeed {
    fn currency_id(&self) -> &str {
        &self.currency_id
    }

    async fn usd_price(&self) -> AppResult<Decimal> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("ids", self.currency_id.as_str()), ("vs_currencies", "usd")])
            .send()
            .await
            .map_err(|e| UpstreamError::PriceUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(UpstreamError::PriceUnavailable(format!(
                "price API returned {}",
                response.status()
            ))
            .into());
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| UpstreamError::PriceUnavailable(e.to_string()))?;

        let price = extract_usd(&body, &self.currency_id)?;
        info!("💲 Fetched {} price: ${}", self.currency_id, price);
        Ok(price)
    }
}
