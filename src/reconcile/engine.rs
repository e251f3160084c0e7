use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use super::derive::{self, Dashboard, TickInputs};
use crate::campaign::amount::{self, Wei};
use crate::campaign::models::PLACEHOLDER_IMAGE;
use crate::campaign::{CampaignId, CampaignRecord, CampaignView, DonorEntry, NewCampaign};
use crate::contract::{CampaignReader, CampaignWriter, DonorNftReader, TxOutcome};
use crate::error::{AppError, AppResult, ContractError, ValidationError};
use crate::price::{CachedPrice, PriceCache};

/// Records fetched in one refresh pass, newest first
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub records: Vec<CampaignRecord>,
    pub total_funds_raised: Option<Wei>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn find(&self, id: CampaignId) -> Option<&CampaignRecord> {
        self.records.iter().find(|r| r.id == id)
    }
}

/// The connected account and the provider that signs for it.
/// Replaced wholesale whenever the wallet changes.
#[derive(Clone)]
pub struct WalletContext {
    pub account: String,
    pub signer: Arc<dyn CampaignWriter>,
}

impl WalletContext {
    pub fn new(account: impl Into<String>, signer: Arc<dyn CampaignWriter>) -> Self {
        Self {
            account: account.into(),
            signer,
        }
    }
}

/// Upper bound on `campaignCount`; a larger value is treated as a bad read
pub const MAX_CAMPAIGN_COUNT: u64 = 100_000;

/// Raw donor amounts per campaign; USD is applied at read time
type DonorLists = HashMap<CampaignId, Vec<(String, Wei)>>;

/// Campaign lifecycle reconciliation engine.
///
/// Holds the latest snapshot and derives presentation state from it on
/// demand. The snapshot is only ever replaced, never patched, so readers see
/// either the previous batch or the next one.
pub struct ReconciliationEngine {
    reader: Arc<dyn CampaignReader>,
    nfts: Arc<dyn DonorNftReader>,
    prices: Arc<PriceCache>,
    snapshot: RwLock<Arc<Snapshot>>,
    donors: RwLock<DonorLists>,
    wallet: RwLock<Option<WalletContext>>,
    // refreshes run one at a time so an older batch never replaces a newer one
    refresh_lock: Mutex<()>,
}

impl ReconciliationEngine {
    pub fn new(
        reader: Arc<dyn CampaignReader>,
        nfts: Arc<dyn DonorNftReader>,
        prices: Arc<PriceCache>,
        wallet: Option<WalletContext>,
    ) -> Self {
        Self {
            reader,
            nfts,
            prices,
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            donors: RwLock::new(HashMap::new()),
            wallet: RwLock::new(wallet),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().clone()
    }

    pub fn account(&self) -> Option<String> {
        self.wallet.read().as_ref().map(|w| w.account.clone())
    }

    /// Re-inject the wallet after an account change; `None` disconnects
    pub fn set_wallet(&self, wallet: Option<WalletContext>) {
        match &wallet {
            Some(w) => info!("👛 Wallet account set to {}", w.account),
            None => info!("👛 Wallet disconnected"),
        }
        *self.wallet.write() = wallet;
    }

    fn require_wallet(&self) -> AppResult<WalletContext> {
        self.wallet.read().clone().ok_or_else(|| {
            AppError::WalletUnavailable("Connect a wallet account to send transactions".to_string())
        })
    }

    /// Presentation state at `now` (Unix seconds)
    pub fn derive(&self, now: i64) -> Dashboard {
        let snapshot = self.snapshot();
        let price_usd = self.prices.price();
        let account = self.account();

        let inputs = TickInputs {
            now,
            price_usd,
            account: account.as_deref(),
        };

        Dashboard {
            now,
            campaigns: derive::tick(&snapshot.records, &inputs),
            price_usd,
            total_funds_raised_eth: derive::total_eth(snapshot.total_funds_raised),
            snapshot_fetched_at: snapshot.fetched_at,
        }
    }

    pub fn view(&self, id: CampaignId, now: i64) -> AppResult<CampaignView> {
        let snapshot = self.snapshot();
        let record = snapshot
            .find(id)
            .ok_or_else(|| AppError::NotFound(format!("Campaign {} not found", id)))?;
        let account = self.account();
        let inputs = TickInputs {
            now,
            price_usd: self.prices.price(),
            account: account.as_deref(),
        };
        Ok(derive::derive_view(record, &inputs))
    }

    /// Re-read every campaign and swap the snapshot in one step.
    ///
    /// Ids are fetched in ascending order; an id that fails is logged and
    /// skipped. Only a failing `campaignCount` aborts the pass, leaving the
    /// previous snapshot in place.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> AppResult<Arc<Snapshot>> {
        let _guard = self.refresh_lock.lock().await;

        let count = self.reader.campaign_count().await.map_err(|e| {
            error!("❌ Failed to load campaigns: {}", e);
            e
        })?;
        if count > MAX_CAMPAIGN_COUNT {
            error!("❌ Refusing campaign count {} from node", count);
            return Err(ContractError::Decode {
                method: "campaignCount",
                reason: format!("count {} exceeds {}", count, MAX_CAMPAIGN_COUNT),
            }
            .into());
        }

        let mut records = Vec::new();
        for id in 1..=count {
            match self.fetch_record(id).await {
                Ok(record) => records.push(record),
                Err(e) => warn!("⚠️ Skipping campaign {}: {}", id, e),
            }
        }
        records.reverse();

        let previous_total = self.snapshot().total_funds_raised;
        let total_funds_raised = match self.reader.total_funds_raised().await {
            Ok(total) => Some(total),
            Err(e) => {
                warn!("⚠️ Could not read total funds raised: {}", e);
                previous_total
            }
        };

        let next = Arc::new(Snapshot {
            records,
            total_funds_raised,
            fetched_at: Some(Utc::now()),
        });
        *self.snapshot.write() = next.clone();

        info!("🔄 Loaded {} of {} campaigns", next.records.len(), count);
        Ok(next)
    }

    async fn fetch_record(&self, id: CampaignId) -> AppResult<CampaignRecord> {
        let data = self.reader.campaign(id).await?;
        let status = self.reader.campaign_status(id).await?;
        Ok(CampaignRecord {
            id,
            fundraiser: data.fundraiser,
            title: data.title,
            goal: data.goal,
            raised_amount: data.raised_amount,
            deadline: data.deadline,
            story: data.story,
            image_url: data.image_url,
            backup_image_url: PLACEHOLDER_IMAGE.to_string(),
            status,
        })
    }

    async fn refresh_after_write(&self, what: &str) {
        if let Err(e) = self.refresh().await {
            warn!("⚠️ {} confirmed but refresh failed: {}", what, e);
        }
    }

    /// Donate `amount` wei to campaign `id`.
    ///
    /// `goal` bounds the amount locally; when omitted the goal from the
    /// current snapshot is used. Both checks run before any contract call.
    #[instrument(skip(self))]
    pub async fn donate(
        &self,
        id: CampaignId,
        amount: Wei,
        goal: Option<Wei>,
    ) -> AppResult<TxOutcome> {
        let goal = match goal {
            Some(goal) => goal,
            None => self
                .snapshot()
                .find(id)
                .map(|r| r.goal)
                .ok_or_else(|| AppError::NotFound(format!("Campaign {} not found", id)))?,
        };
        check_donation(amount, goal)?;

        let wallet = self.require_wallet()?;
        let outcome = wallet.signer.donate(&wallet.account, id, amount).await.map_err(|e| {
            error!("❌ Donation to campaign {} failed: {}", id, e);
            e
        })?;
        info!("💸 Donated {} ETH to campaign {}", amount::wei_to_eth(amount), id);

        self.refresh_after_write("Donation").await;
        Ok(outcome)
    }

    /// Same as [`donate`](Self::donate) with the amount given in ETH
    pub async fn donate_ether(
        &self,
        id: CampaignId,
        amount_eth: &str,
        goal: Option<Wei>,
    ) -> AppResult<TxOutcome> {
        let amount = amount::parse_ether(amount_eth)?;
        self.donate(id, amount, goal).await
    }

    /// Withdraw raised funds. The contract decides who may do this and when.
    #[instrument(skip(self))]
    pub async fn withdraw(&self, id: CampaignId) -> AppResult<TxOutcome> {
        let wallet = self.require_wallet()?;
        let outcome = wallet
            .signer
            .withdraw_funds(&wallet.account, id)
            .await
            .map_err(|e| {
                error!("❌ Withdrawal from campaign {} failed: {}", id, e);
                e
            })?;
        info!("🏦 Withdrew funds from campaign {}", id);

        self.refresh_after_write("Withdrawal").await;
        Ok(outcome)
    }

    #[instrument(skip(self, campaign), fields(title = %campaign.title))]
    pub async fn create_campaign(&self, campaign: NewCampaign) -> AppResult<TxOutcome> {
        check_new_campaign(&campaign)?;

        let wallet = self.require_wallet()?;
        let outcome = wallet
            .signer
            .create_campaign(&wallet.account, &campaign)
            .await
            .map_err(|e| {
                error!("❌ Creating campaign '{}' failed: {}", campaign.title, e);
                e
            })?;
        info!("🆕 Campaign '{}' created", campaign.title);

        self.refresh_after_write("Campaign creation").await;
        Ok(outcome)
    }

    /// Fetch the donors of one campaign and their cumulative amounts.
    ///
    /// A failure leaves every stored list, including this campaign's
    /// previous one, untouched.
    #[instrument(skip(self))]
    pub async fn expand_donors(&self, id: CampaignId) -> AppResult<Vec<DonorEntry>> {
        let addresses = self.reader.campaign_donors(id).await.map_err(|e| {
            error!("❌ Failed to fetch donors for campaign {}: {}", id, e);
            e
        })?;

        let amounts = try_join_all(
            addresses
                .iter()
                .map(|donor| self.reader.donation(id, donor)),
        )
        .await
        .map_err(|e| {
            error!("❌ Failed to fetch donation amounts for campaign {}: {}", id, e);
            e
        })?;

        let entries: Vec<(String, Wei)> = addresses.into_iter().zip(amounts).collect();
        self.donors.write().insert(id, entries);

        Ok(self.donors(id).unwrap_or_default())
    }

    /// Last fetched donor list for a campaign
    pub fn donors(&self, id: CampaignId) -> Option<Vec<DonorEntry>> {
        let price = self.prices.price();
        self.donors.read().get(&id).map(|entries| {
            entries
                .iter()
                .map(|(address, amount)| DonorEntry::new(address.clone(), *amount, price))
                .collect()
        })
    }

    /// Advisory; a failure only hides USD figures
    pub async fn refresh_price(&self) -> AppResult<CachedPrice> {
        self.prices.refresh().await
    }

    pub fn price(&self) -> Option<CachedPrice> {
        self.prices.get()
    }

    /// NFT ids minted to the connected account for its donations.
    /// Read failures yield an empty list.
    pub async fn donor_nfts(&self) -> AppResult<Vec<u128>> {
        let account = self
            .account()
            .ok_or_else(|| AppError::WalletUnavailable("No wallet account connected".to_string()))?;

        match self.nfts.donor_nfts(&account).await {
            Ok(ids) => Ok(ids),
            Err(e) => {
                warn!("⚠️ Error fetching donor NFTs for {}: {}", account, e);
                Ok(Vec::new())
            }
        }
    }
}

/// Local donation guard.
///
/// The goal bound is stricter than anything the contract is known to
/// enforce; the contract remains the authority.
pub fn check_donation(amount: Wei, goal: Wei) -> Result<(), ValidationError> {
    if amount == 0 {
        return Err(ValidationError::NonPositiveAmount);
    }
    if amount > goal {
        return Err(ValidationError::AmountExceedsGoal);
    }
    Ok(())
}

pub fn check_new_campaign(campaign: &NewCampaign) -> Result<(), ValidationError> {
    let blank = |field: &str| ValidationError::InvalidInput(format!("{} is required", field));
    if campaign.title.trim().is_empty() {
        return Err(blank("title"));
    }
    if campaign.story.trim().is_empty() {
        return Err(blank("story"));
    }
    if campaign.image_url.trim().is_empty() {
        return Err(blank("image_url"));
    }
    if campaign.goal == 0 {
        return Err(ValidationError::InvalidInput("goal must be greater than 0".to_string()));
    }
    if campaign.duration_seconds == 0 {
        return Err(ValidationError::InvalidInput(
            "duration must be greater than 0".to_string(),
        ));
    }
    Ok(())
}
