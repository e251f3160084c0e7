use async_trait::async_trait;
use serde::Serialize;

use crate::campaign::{CampaignId, CampaignStatus, NewCampaign, Wei};
use crate::error::AppResult;

/// Fields returned by `campaigns(id)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignData {
    pub fundraiser: String,
    pub title: String,
    pub goal: Wei,
    pub raised_amount: Wei,
    pub deadline: i64,
    pub story: String,
    pub image_url: String,
}

/// A write that has been included in a block
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TxOutcome {
    pub tx_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<String>,
}

/// Read side of the campaign contract
#[async_trait]
pub trait CampaignReader: Send + Sync {
    async fn campaign_count(&self) -> AppResult<u64>;

    async fn campaign(&self, id: CampaignId) -> AppResult<CampaignData>;

    async fn campaign_status(&self, id: CampaignId) -> AppResult<CampaignStatus>;

    async fn campaign_donors(&self, id: CampaignId) -> AppResult<Vec<String>>;

    /// Cumulative amount `donor` has given to campaign `id`
    async fn donation(&self, id: CampaignId, donor: &str) -> AppResult<Wei>;

    async fn total_funds_raised(&self) -> AppResult<Wei>;
}

/// Write side of the campaign contract.
///
/// Every call resolves only once the transaction is included; there is no
/// timeout, the provider owns that policy.
#[async_trait]
pub trait CampaignWriter: Send + Sync {
    async fn donate(&self, from: &str, id: CampaignId, amount: Wei) -> AppResult<TxOutcome>;

    async fn withdraw_funds(&self, from: &str, id: CampaignId) -> AppResult<TxOutcome>;

    async fn create_campaign(&self, from: &str, campaign: &NewCampaign) -> AppResult<TxOutcome>;
}

#[async_trait]
pub trait DonorNftReader: Send + Sync {
    async fn donor_nfts(&self, owner: &str) -> AppResult<Vec<u128>>;
}

/// Accounts the connected provider can sign for
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn accounts(&self) -> AppResult<Vec<String>>;
}
