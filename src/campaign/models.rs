use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::amount::{self, Wei};

pub type CampaignId = u64;

/// Shown when a campaign has no image of its own
pub const PLACEHOLDER_IMAGE: &str = "/placeholder-image.jpg";

/// Status flags reported by the contract at fetch time
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CampaignStatus {
    pub is_active: bool,
    pub goal_reached: bool,
    pub funds_withdrawn: bool,
    /// Seconds left according to the chain's own clock. Informational only.
    pub time_remaining: u64,
}

/// A campaign as read from the contract. Immutable once fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CampaignRecord {
    pub id: CampaignId,
    pub fundraiser: String,
    pub title: String,
    #[serde(with = "wei_string")]
    pub goal: Wei,
    #[serde(with = "wei_string")]
    pub raised_amount: Wei,
    /// Unix timestamp, seconds
    pub deadline: i64,
    pub story: String,
    pub image_url: String,
    pub backup_image_url: String,
    pub status: CampaignStatus,
}

impl CampaignRecord {
    /// Image to render, falling back to the backup and then the placeholder
    pub fn display_image(&self) -> &str {
        if !self.image_url.is_empty() {
            &self.image_url
        } else if !self.backup_image_url.is_empty() {
            &self.backup_image_url
        } else {
            PLACEHOLDER_IMAGE
        }
    }

    pub fn is_owned_by(&self, account: &str) -> bool {
        self.fundraiser.eq_ignore_ascii_case(account)
    }
}

/// Presentation state for one campaign at one instant
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CampaignView {
    #[serde(flatten)]
    pub record: CampaignRecord,
    pub time_remaining_seconds: u64,
    pub time_remaining_label: String,
    pub is_presented_active: bool,
    pub progress_percent: Decimal,
    pub raised_eth: Decimal,
    pub goal_eth: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usd_value: Option<Decimal>,
    pub can_withdraw: bool,
    pub display_image: String,
}

/// One donor's cumulative contribution to a campaign
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DonorEntry {
    pub address: String,
    #[serde(with = "wei_string")]
    pub amount: Wei,
    pub amount_eth: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usd_value: Option<Decimal>,
}

impl DonorEntry {
    pub fn new(address: String, amount: Wei, price_usd: Option<Decimal>) -> Self {
        Self {
            address,
            amount,
            amount_eth: amount::wei_to_eth(amount),
            usd_value: amount::usd_value(amount, price_usd),
        }
    }
}

/// Preset campaign durations offered by the create form
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DurationPreset {
    pub label: &'static str,
    pub seconds: u64,
}

pub const DURATION_PRESETS: [DurationPreset; 7] = [
    DurationPreset { label: "2 Minutes", seconds: 120 },
    DurationPreset { label: "5 Minutes", seconds: 300 },
    DurationPreset { label: "15 Minutes", seconds: 900 },
    DurationPreset { label: "1 Hour", seconds: 3_600 },
    DurationPreset { label: "1 Day", seconds: 86_400 },
    DurationPreset { label: "7 Days", seconds: 604_800 },
    DurationPreset { label: "30 Days", seconds: 2_592_000 },
];

/// Arguments for `createCampaign`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCampaign {
    pub title: String,
    pub goal: Wei,
    pub duration_seconds: u64,
    pub story: String,
    pub image_url: String,
}

/// Wei amounts travel as decimal strings; JSON numbers cannot hold them exactly.
pub(crate) mod wei_string {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use crate::campaign::amount::Wei;

    pub fn serialize<S: Serializer>(value: &Wei, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Wei, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<Wei>().map_err(D::Error::custom)
    }
}
