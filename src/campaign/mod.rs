pub mod amount;
pub mod models;

pub use amount::Wei;
pub use models::{
    CampaignId, CampaignRecord, CampaignStatus, CampaignView, DonorEntry, DurationPreset,
    NewCampaign, DURATION_PRESETS,
};
