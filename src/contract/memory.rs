//! In-process stand-in for the campaign contracts, used by tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use super::traits::{
    CampaignData, CampaignReader, CampaignWriter, DonorNftReader, TxOutcome, WalletProvider,
};
use crate::campaign::{CampaignId, CampaignStatus, NewCampaign, Wei};
use crate::error::{AppResult, ContractError};

#[derive(Default)]
struct State {
    now: i64,
    campaigns: Vec<(CampaignData, CampaignStatus)>,
    donations: HashMap<(CampaignId, String), Wei>,
    donors: HashMap<CampaignId, Vec<String>>,
    nfts: HashMap<String, Vec<u128>>,
    accounts: Vec<String>,
    failing_ids: HashSet<CampaignId>,
    failing_donor_lists: HashSet<CampaignId>,
    fail_count: bool,
    count_override: Option<u64>,
    fail_total: bool,
    fail_nfts: bool,
    next_tx: u64,
}

/// Pauses a read of one campaign id until released
struct Gate {
    id: CampaignId,
    reached: Arc<Notify>,
    release: Arc<Notify>,
}

#[derive(Default)]
pub struct InMemoryContract {
    state: Mutex<State>,
    gate: Mutex<Option<Gate>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl InMemoryContract {
    pub fn new(now: i64) -> Self {
        let contract = Self::default();
        contract.state.lock().now = now;
        contract
    }

    /// Add a campaign and return its id (1-based, ascending)
    pub fn add_campaign(
        &self,
        fundraiser: &str,
        goal: Wei,
        raised: Wei,
        deadline: i64,
        is_active: bool,
    ) -> CampaignId {
        let mut state = self.state.lock();
        let id = state.campaigns.len() as CampaignId + 1;
        let now = state.now;
        state.campaigns.push((
            CampaignData {
                fundraiser: fundraiser.to_string(),
                title: format!("Campaign {}", id),
                goal,
                raised_amount: raised,
                deadline,
                story: format!("Story {}", id),
                image_url: String::new(),
            },
            CampaignStatus {
                is_active,
                goal_reached: raised >= goal,
                funds_withdrawn: false,
                time_remaining: (deadline - now).max(0) as u64,
            },
        ));
        id
    }

    pub fn set_raised(&self, id: CampaignId, raised: Wei) {
        let mut state = self.state.lock();
        if let Some((data, _)) = state.campaigns.get_mut(id as usize - 1) {
            data.raised_amount = raised;
        }
    }

    pub fn fail_campaign(&self, id: CampaignId) {
        self.state.lock().failing_ids.insert(id);
    }

    pub fn fail_donor_list(&self, id: CampaignId) {
        self.state.lock().failing_donor_lists.insert(id);
    }

    pub fn fail_count(&self, fail: bool) {
        self.state.lock().fail_count = fail;
    }

    /// Report `count` from `campaignCount` regardless of stored campaigns
    pub fn set_count(&self, count: u64) {
        self.state.lock().count_override = Some(count);
    }

    pub fn fail_total(&self, fail: bool) {
        self.state.lock().fail_total = fail;
    }

    pub fn fail_nfts(&self, fail: bool) {
        self.state.lock().fail_nfts = fail;
    }

    pub fn add_account(&self, account: &str) {
        self.state.lock().accounts.push(account.to_string());
    }

    pub fn set_nfts(&self, owner: &str, ids: Vec<u128>) {
        self.state.lock().nfts.insert(owner.to_lowercase(), ids);
    }

    /// Block the next read of campaign `id` until `release` is notified;
    /// `reached` fires once the read is parked.
    pub fn pause_at(&self, id: CampaignId) -> (Arc<Notify>, Arc<Notify>) {
        let reached = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.gate.lock() = Some(Gate {
            id,
            reached: reached.clone(),
            release: release.clone(),
        });
        (reached, release)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }

    fn tx(&self) -> TxOutcome {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        state.next_tx += 1;
        TxOutcome {
            tx_hash: format!("0x{:064x}", state.next_tx),
            block_number: Some(format!("0x{:x}", state.next_tx)),
        }
    }

    fn failure(method: &'static str, id: CampaignId) -> crate::error::AppError {
        ContractError::CampaignCall {
            method,
            campaign_id: id,
            reason: "execution reverted".to_string(),
        }
        .into()
    }
}

#[async_trait]
impl CampaignReader for InMemoryContract {
    async fn campaign_count(&self) -> AppResult<u64> {
        self.read();
        let state = self.state.lock();
        if state.fail_count {
            return Err(ContractError::Transport("connection refused".to_string()).into());
        }
        Ok(state
            .count_override
            .unwrap_or(state.campaigns.len() as u64))
    }

    async fn campaign(&self, id: CampaignId) -> AppResult<CampaignData> {
        self.read();
        let gate = {
            let mut slot = self.gate.lock();
            if slot.as_ref().map(|g| g.id) == Some(id) {
                slot.take()
            } else {
                None
            }
        };
        if let Some(gate) = gate {
            gate.reached.notify_one();
            gate.release.notified().await;
        }

        let state = self.state.lock();
        if state.failing_ids.contains(&id) {
            return Err(Self::failure("campaigns", id));
        }
        state
            .campaigns
            .get(id as usize - 1)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| Self::failure("campaigns", id))
    }

    async fn campaign_status(&self, id: CampaignId) -> AppResult<CampaignStatus> {
        self.read();
        let state = self.state.lock();
        state
            .campaigns
            .get(id as usize - 1)
            .map(|(_, status)| status.clone())
            .ok_or_else(|| Self::failure("getCampaignStatus", id))
    }

    async fn campaign_donors(&self, id: CampaignId) -> AppResult<Vec<String>> {
        self.read();
        let state = self.state.lock();
        if state.failing_donor_lists.contains(&id) {
            return Err(Self::failure("getCampaignDonors", id));
        }
        Ok(state.donors.get(&id).cloned().unwrap_or_default())
    }

    async fn donation(&self, id: CampaignId, donor: &str) -> AppResult<Wei> {
        self.read();
        let state = self.state.lock();
        Ok(state
            .donations
            .get(&(id, donor.to_lowercase()))
            .copied()
            .unwrap_or(0))
    }

    async fn total_funds_raised(&self) -> AppResult<Wei> {
        self.read();
        let state = self.state.lock();
        if state.fail_total {
            return Err(ContractError::Transport("timeout".to_string()).into());
        }
        Ok(state.campaigns.iter().map(|(data, _)| data.raised_amount).sum())
    }
}

#[async_trait]
impl CampaignWriter for InMemoryContract {
    async fn donate(&self, from: &str, id: CampaignId, amount: Wei) -> AppResult<TxOutcome> {
        {
            let mut state = self.state.lock();
            let now = state.now;
            let (data, status) = state
                .campaigns
                .get_mut(id as usize - 1)
                .ok_or_else(|| Self::failure("donate", id))?;
            if !status.is_active || data.deadline <= now {
                return Err(Self::failure("donate", id));
            }
            data.raised_amount += amount;
            status.goal_reached = data.raised_amount >= data.goal;

            let donor = from.to_lowercase();
            *state.donations.entry((id, donor.clone())).or_insert(0) += amount;
            let donors = state.donors.entry(id).or_default();
            if !donors.contains(&donor) {
                donors.push(donor);
            }
        }
        Ok(self.tx())
    }

    async fn withdraw_funds(&self, from: &str, id: CampaignId) -> AppResult<TxOutcome> {
        {
            let mut state = self.state.lock();
            let (data, status) = state
                .campaigns
                .get_mut(id as usize - 1)
                .ok_or_else(|| Self::failure("withdrawFunds", id))?;
            if !data.fundraiser.eq_ignore_ascii_case(from) || status.funds_withdrawn {
                return Err(Self::failure("withdrawFunds", id));
            }
            status.funds_withdrawn = true;
            status.is_active = false;
        }
        Ok(self.tx())
    }

    async fn create_campaign(&self, from: &str, campaign: &NewCampaign) -> AppResult<TxOutcome> {
        {
            let mut state = self.state.lock();
            let deadline = state.now + campaign.duration_seconds as i64;
            state.campaigns.push((
                CampaignData {
                    fundraiser: from.to_lowercase(),
                    title: campaign.title.clone(),
                    goal: campaign.goal,
                    raised_amount: 0,
                    deadline,
                    story: campaign.story.clone(),
                    image_url: campaign.image_url.clone(),
                },
                CampaignStatus {
                    is_active: true,
                    goal_reached: false,
                    funds_withdrawn: false,
                    time_remaining: campaign.duration_seconds,
                },
            ));
        }
        Ok(self.tx())
    }
}

#[async_trait]
impl DonorNftReader for InMemoryContract {
    async fn donor_nfts(&self, owner: &str) -> AppResult<Vec<u128>> {
        self.read();
        let state = self.state.lock();
        if state.fail_nfts {
            return Err(ContractError::Transport("nft contract unreachable".to_string()).into());
        }
        Ok(state.nfts.get(&owner.to_lowercase()).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl WalletProvider for InMemoryContract {
    async fn accounts(&self) -> AppResult<Vec<String>> {
        Ok(self.state.lock().accounts.clone())
    }
}
