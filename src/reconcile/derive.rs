//! Pure derivation of presentation state from a snapshot and a timestamp.
//!
//! Nothing here reads a clock or touches shared state; the caller supplies
//! `now` and owns any caching of the result.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::campaign::amount::{self, Wei};
use crate::campaign::{CampaignRecord, CampaignView};

/// Everything one tick needs besides the records
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInputs<'a> {
    /// Unix seconds
    pub now: i64,
    pub price_usd: Option<Decimal>,
    pub account: Option<&'a str>,
}

/// Records split by presented status, fetch order preserved within each side
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Partition {
    pub active: Vec<CampaignView>,
    pub ended: Vec<CampaignView>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.active.len() + self.ended.len()
    }

    pub fn find(&self, id: u64) -> Option<&CampaignView> {
        self.active
            .iter()
            .chain(self.ended.iter())
            .find(|v| v.record.id == id)
    }
}

/// Everything the dashboard shows at one instant
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Dashboard {
    pub now: i64,
    #[serde(flatten)]
    pub campaigns: Partition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_funds_raised_eth: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_fetched_at: Option<DateTime<Utc>>,
}

/// `max(0, deadline - now)`
pub fn time_remaining(deadline: i64, now: i64) -> u64 {
    u64::try_from(deadline.saturating_sub(now)).unwrap_or(0)
}

pub fn is_presented_active(deadline: i64, is_active: bool, now: i64) -> bool {
    time_remaining(deadline, now) > 0 && is_active
}

/// Countdown label: `Ended`, `3d 4h`, `2h 5m`, `4m 10s`, `9s`
pub fn format_time_remaining(seconds: u64) -> String {
    if seconds == 0 {
        return "Ended".to_string();
    }
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

pub fn derive_view(record: &CampaignRecord, inputs: &TickInputs<'_>) -> CampaignView {
    let remaining = time_remaining(record.deadline, inputs.now);
    let active = remaining > 0 && record.status.is_active;

    let can_withdraw = match inputs.account {
        Some(account) => !active && record.is_owned_by(account) && !record.status.funds_withdrawn,
        None => false,
    };

    CampaignView {
        time_remaining_seconds: remaining,
        time_remaining_label: format_time_remaining(remaining),
        is_presented_active: active,
        progress_percent: amount::progress_percent(record.raised_amount, record.goal),
        raised_eth: amount::wei_to_eth(record.raised_amount),
        goal_eth: amount::wei_to_eth(record.goal),
        usd_value: amount::usd_value(record.raised_amount, inputs.price_usd),
        can_withdraw,
        display_image: record.display_image().to_string(),
        record: record.clone(),
    }
}

/// Derive every record and split into active / ended
pub fn tick(records: &[CampaignRecord], inputs: &TickInputs<'_>) -> Partition {
    let mut partition = Partition::default();
    for record in records {
        let view = derive_view(record, inputs);
        if view.is_presented_active {
            partition.active.push(view);
        } else {
            partition.ended.push(view);
        }
    }
    partition
}

pub fn total_eth(total: Option<Wei>) -> Option<Decimal> {
    total.map(amount::wei_to_eth)
}
