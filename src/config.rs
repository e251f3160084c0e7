use serde::Deserialize;
use std::time::Duration;

use crate::error::ConfigurationError;

/// Required settings. Startup fails on the first one that is absent.
const REQUIRED: [&str; 5] = [
    "CONTRACT_ADDRESS",
    "NFT_CONTRACT_ADDRESS",
    "RPC_URL",
    "PINATA_API_KEY",
    "PINATA_SECRET_KEY",
];

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub contract_address: String,
    pub nft_contract_address: String,
    pub rpc_url: String,
    pub pinata_api_key: String,
    pub pinata_secret_key: String,
    pub bind_address: String,
    pub price_api_url: String,
    pub price_currency_id: String,
    pub pinata_upload_url: String,
    pub tick_interval: Duration,
    pub receipt_poll_interval: Duration,
    pub wallet_address: Option<String>,
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load settings from the process environment (after `.env` has been applied)
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let settings = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?;
        Self::from_settings(&settings)
    }

    pub fn from_settings(settings: &config::Config) -> Result<Self, ConfigurationError> {
        for key in REQUIRED {
            required(settings, key)?;
        }

        let contract_address = required(settings, "CONTRACT_ADDRESS")?;
        let nft_contract_address = required(settings, "NFT_CONTRACT_ADDRESS")?;
        check_address("CONTRACT_ADDRESS", &contract_address)?;
        check_address("NFT_CONTRACT_ADDRESS", &nft_contract_address)?;

        let wallet_address = optional(settings, "WALLET_ADDRESS");
        if let Some(address) = &wallet_address {
            check_address("WALLET_ADDRESS", address)?;
        }

        Ok(Self {
            contract_address,
            nft_contract_address,
            rpc_url: required(settings, "RPC_URL")?,
            pinata_api_key: required(settings, "PINATA_API_KEY")?,
            pinata_secret_key: required(settings, "PINATA_SECRET_KEY")?,
            bind_address: optional(settings, "BIND_ADDRESS")
                .unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            price_api_url: optional(settings, "PRICE_API_URL").unwrap_or_else(|| {
                "https://api.coingecko.com/api/v3/simple/price".to_string()
            }),
            price_currency_id: optional(settings, "PRICE_CURRENCY_ID")
                .unwrap_or_else(|| "ethereum".to_string()),
            pinata_upload_url: optional(settings, "PINATA_UPLOAD_URL").unwrap_or_else(|| {
                "https://api.pinata.cloud/pinning/pinFileToIPFS".to_string()
            }),
            tick_interval: Duration::from_millis(millis(settings, "TICK_INTERVAL_MS", 1000)?),
            receipt_poll_interval: Duration::from_millis(millis(
                settings,
                "RECEIPT_POLL_INTERVAL_MS",
                2000,
            )?),
            wallet_address,
            allowed_origins: optional(settings, "ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_else(|| vec!["http://localhost:5173".to_string()]),
        })
    }
}

// `config::Environment` lower-cases keys, so `RPC_URL` is stored as `rpc_url`.
fn lookup(settings: &config::Config, key: &str) -> Option<String> {
    settings
        .get_string(&key.to_lowercase())
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(settings: &config::Config, key: &'static str) -> Result<String, ConfigurationError> {
    lookup(settings, key).ok_or(ConfigurationError::MissingVariable(key))
}

fn optional(settings: &config::Config, key: &'static str) -> Option<String> {
    lookup(settings, key)
}

fn millis(
    settings: &config::Config,
    key: &'static str,
    default: u64,
) -> Result<u64, ConfigurationError> {
    match lookup(settings, key) {
        None => Ok(default),
        Some(raw) => match raw.parse::<u64>() {
            Ok(0) => Err(ConfigurationError::InvalidVariable {
                key,
                reason: "must be greater than zero".to_string(),
            }),
            Ok(value) => Ok(value),
            Err(e) => Err(ConfigurationError::InvalidVariable {
                key,
                reason: e.to_string(),
            }),
        },
    }
}

fn check_address(key: &'static str, value: &str) -> Result<(), ConfigurationError> {
    if crate::contract::abi::is_address(value) {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidVariable {
            key,
            reason: format!("'{}' is not a 0x-prefixed 20 byte address", value),
        })
    }
}
