use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{debug, info, instrument, warn};

use super::abi::{self, selectors, Decoder, Token};
use super::rpc::{RpcClient, TransactionRequest};
use super::traits::{
    CampaignData, CampaignReader, CampaignWriter, DonorNftReader, TxOutcome, WalletProvider,
};
use crate::campaign::{CampaignId, CampaignStatus, NewCampaign, Wei};
use crate::error::{AppError, AppResult, ContractError, ValidationError};

/// Campaign + donor NFT contracts reached through a JSON-RPC node
pub struct EvmCampaignContract {
    rpc: Arc<RpcClient>,
    address: String,
    nft_address: String,
    receipt_poll_interval: Duration,
}

impl EvmCampaignContract {
    pub fn new(
        rpc: Arc<RpcClient>,
        address: impl Into<String>,
        nft_address: impl Into<String>,
        receipt_poll_interval: Duration,
    ) -> Self {
        Self {
            rpc,
            address: address.into(),
            nft_address: nft_address.into(),
            receipt_poll_interval,
        }
    }

    async fn call(
        &self,
        to: &str,
        method: &'static str,
        selector: selectors::Selector,
        args: &[Token],
    ) -> AppResult<Vec<u8>> {
        let data = abi::to_hex(&abi::encode_call(selector, args));
        let raw = self.rpc.eth_call(to, &data).await?;
        abi::from_hex(&raw).map_err(|e| decode_error(method, e))
    }

    async fn transact(
        &self,
        from: &str,
        method: &'static str,
        selector: selectors::Selector,
        args: &[Token],
        value: Option<Wei>,
    ) -> AppResult<TxOutcome> {
        abi::parse_address(from)?;
        let tx = TransactionRequest {
            from: from.to_string(),
            to: self.address.clone(),
            data: abi::to_hex(&abi::encode_call(selector, args)),
            value: value.map(abi::to_quantity),
        };

        let tx_hash = self.rpc.eth_send_transaction(&tx).await?;
        info!("📤 {} submitted: {}", method, tx_hash);

        self.wait_for_inclusion(&tx_hash).await
    }

    /// Poll until the receipt shows up. No timeout.
    async fn wait_for_inclusion(&self, tx_hash: &str) -> AppResult<TxOutcome> {
        let mut attempts: u64 = 0;
        loop {
            match self.rpc.eth_get_transaction_receipt(tx_hash).await? {
                Some(receipt) => {
                    if !receipt.succeeded() {
                        warn!("❌ Transaction {} reverted", tx_hash);
                        return Err(ContractError::Reverted {
                            tx_hash: tx_hash.to_string(),
                        }
                        .into());
                    }
                    info!("✅ Transaction {} included", tx_hash);
                    return Ok(TxOutcome {
                        tx_hash: receipt.transaction_hash,
                        block_number: receipt.block_number,
                    });
                }
                None => {
                    attempts += 1;
                    if attempts % 30 == 0 {
                        warn!("⏳ Transaction {} still pending after {} polls", tx_hash, attempts);
                    } else {
                        debug!("Transaction {} pending", tx_hash);
                    }
                    time::sleep(self.receipt_poll_interval).await;
                }
            }
        }
    }
}

fn decode_error(method: &'static str, error: abi::AbiError) -> AppError {
    ContractError::Decode {
        method,
        reason: error.to_string(),
    }
    .into()
}

/// Tag a contract failure with the campaign it was reading
fn campaign_call(method: &'static str, id: CampaignId, error: AppError) -> AppError {
    match error {
        AppError::Contract(e) => ContractError::CampaignCall {
            method,
            campaign_id: id,
            reason: e.to_string(),
        }
        .into(),
        other => other,
    }
}

fn address_token(address: &str) -> Result<Token, ValidationError> {
    abi::parse_address(address).map(Token::Address)
}

/// `campaigns(uint256)` layout: fundraiser, title, goal, raisedAmount,
/// deadline, story, imageUrl
pub fn decode_campaign(data: &[u8]) -> Result<CampaignData, abi::AbiError> {
    let d = Decoder::new(data);
    Ok(CampaignData {
        fundraiser: d.address(0)?,
        title: d.string(1)?,
        goal: d.uint(2)?,
        raised_amount: d.uint(3)?,
        deadline: d.i64(4)?,
        story: d.string(5)?,
        image_url: d.string(6)?,
    })
}

/// `getCampaignStatus(uint256)` layout: isActive, goalReached,
/// fundsWithdrawn, timeRemaining
pub fn decode_status(data: &[u8]) -> Result<CampaignStatus, abi::AbiError> {
    let d = Decoder::new(data);
    Ok(CampaignStatus {
        is_active: d.bool(0)?,
        goal_reached: d.bool(1)?,
        funds_withdrawn: d.bool(2)?,
        time_remaining: d.u64(3)?,
    })
}

#[async_trait]
impl CampaignReader for EvmCampaignContract {
    async fn campaign_count(&self) -> AppResult<u64> {
        let data = self
            .call(&self.address, "campaignCount", selectors::CAMPAIGN_COUNT, &[])
            .await?;
        Decoder::new(&data)
            .u64(0)
            .map_err(|e| decode_error("campaignCount", e))
    }

    #[instrument(skip(self))]
    async fn campaign(&self, id: CampaignId) -> AppResult<CampaignData> {
        let data = self
            .call(&self.address, "campaigns", selectors::CAMPAIGNS, &[Token::Uint(id as u128)])
            .await
            .map_err(|e| campaign_call("campaigns", id, e))?;
        decode_campaign(&data)
            .map_err(|e| campaign_call("campaigns", id, decode_error("campaigns", e)))
    }

    async fn campaign_status(&self, id: CampaignId) -> AppResult<CampaignStatus> {
        let data = self
            .call(
                &self.address,
                "getCampaignStatus",
                selectors::GET_CAMPAIGN_STATUS,
                &[Token::Uint(id as u128)],
            )
            .await
            .map_err(|e| campaign_call("getCampaignStatus", id, e))?;
        decode_status(&data).map_err(|e| {
            campaign_call("getCampaignStatus", id, decode_error("getCampaignStatus", e))
        })
    }

    async fn campaign_donors(&self, id: CampaignId) -> AppResult<Vec<String>> {
        let data = self
            .call(
                &self.address,
                "getCampaignDonors",
                selectors::GET_CAMPAIGN_DONORS,
                &[Token::Uint(id as u128)],
            )
            .await
            .map_err(|e| campaign_call("getCampaignDonors", id, e))?;
        Decoder::new(&data).address_array(0).map_err(|e| {
            campaign_call("getCampaignDonors", id, decode_error("getCampaignDonors", e))
        })
    }

    async fn donation(&self, id: CampaignId, donor: &str) -> AppResult<Wei> {
        let data = self
            .call(
                &self.address,
                "donations",
                selectors::DONATIONS,
                &[Token::Uint(id as u128), address_token(donor)?],
            )
            .await?;
        Decoder::new(&data)
            .uint(0)
            .map_err(|e| decode_error("donations", e))
    }

    async fn total_funds_raised(&self) -> AppResult<Wei> {
        let data = self
            .call(&self.address, "totalFundsRaised", selectors::TOTAL_FUNDS_RAISED, &[])
            .await?;
        Decoder::new(&data)
            .uint(0)
            .map_err(|e| decode_error("totalFundsRaised", e))
    }
}

#[async_trait]
impl CampaignWriter for EvmCampaignContract {
    #[instrument(skip(self))]
    async fn donate(&self, from: &str, id: CampaignId, amount: Wei) -> AppResult<TxOutcome> {
        self.transact(from, "donate", selectors::DONATE, &[Token::Uint(id as u128)], Some(amount))
            .await
    }

    #[instrument(skip(self))]
    async fn withdraw_funds(&self, from: &str, id: CampaignId) -> AppResult<TxOutcome> {
        self.transact(
            from,
            "withdrawFunds",
            selectors::WITHDRAW_FUNDS,
            &[Token::Uint(id as u128)],
            None,
        )
        .await
    }

    #[instrument(skip(self, campaign), fields(title = %campaign.title))]
    async fn create_campaign(&self, from: &str, campaign: &NewCampaign) -> AppResult<TxOutcome> {
        self.transact(
            from,
            "createCampaign",
            selectors::CREATE_CAMPAIGN,
            &[
                Token::String(campaign.title.clone()),
                Token::Uint(campaign.goal),
                Token::Uint(campaign.duration_seconds as u128),
                Token::String(campaign.story.clone()),
                Token::String(campaign.image_url.clone()),
            ],
            None,
        )
        .await
    }
}

#[async_trait]
impl DonorNftReader for EvmCampaignContract {
    async fn donor_nfts(&self, owner: &str) -> AppResult<Vec<u128>> {
        let data = self
            .call(
                &self.nft_address,
                "getDonorNFTs",
                selectors::GET_DONOR_NFTS,
                &[address_token(owner)?],
            )
            .await?;
        Decoder::new(&data)
            .uint_array(0)
            .map_err(|e| decode_error("getDonorNFTs", e))
    }
}

#[async_trait]
impl WalletProvider for EvmCampaignContract {
    async fn accounts(&self) -> AppResult<Vec<String>> {
        self.rpc.eth_accounts().await
    }
}
