use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::campaign::CampaignId;
use crate::campaign::DonorEntry;
use crate::contract::TxOutcome;
use crate::price::CachedPrice;

// ========== REQUEST MODELS ==========

/// Donation in ETH. `goal` (ETH) bounds the amount; omitted means the
/// campaign's current goal.
#[derive(Debug, Deserialize, Validate)]
pub struct DonateRequest {
    #[validate(length(min = 1, message = "Please enter an amount"))]
    pub amount: String,
    pub goal: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCampaignRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    /// ETH
    #[validate(length(min = 1, message = "Goal is required"))]
    pub goal: String,
    #[validate(range(min = 1, message = "Duration must be at least one second"))]
    pub duration_seconds: u64,
    #[validate(length(min = 1, message = "Story is required"))]
    pub story: String,
    #[validate(length(min = 1, message = "Upload an image first"))]
    pub image_url: String,
}

/// `account: null` disconnects the wallet
#[derive(Debug, Deserialize)]
pub struct WalletRequest {
    pub account: Option<String>,
}

// ========== RESPONSE MODELS ==========

#[derive(Debug, Serialize)]
pub struct TxResponse {
    #[serde(flatten)]
    pub outcome: TxOutcome,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DonorsResponse {
    pub campaign_id: CampaignId,
    pub donors: Vec<DonorEntry>,
}

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub account: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NftResponse {
    pub account: String,
    /// Token ids as decimal strings
    pub token_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PriceResponse {
    pub price_usd: Decimal,
    pub fetched_at: DateTime<Utc>,
    pub age_seconds: i64,
}

impl From<CachedPrice> for PriceResponse {
    fn from(cached: CachedPrice) -> Self {
        Self {
            age_seconds: cached.age_seconds(Utc::now()),
            price_usd: cached.price,
            fetched_at: cached.fetched_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_funds_raised_eth: Option<Decimal>,
    pub total_funds_raised_usd: Option<Decimal>,
    pub campaign_count: usize,
    pub active_count: usize,
    pub ended_count: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub campaigns_loaded: usize,
    pub snapshot_fetched_at: Option<DateTime<Utc>>,
    pub price_available: bool,
}
