use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigurationError),

    #[error("Wallet unavailable: {0}")]
    WalletUnavailable(String),

    #[error("Contract call failed: {0}")]
    Contract(#[from] ContractError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Upstream service error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Missing or malformed settings. Always fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Environment variable {0} is not configured")]
    MissingVariable(&'static str),

    #[error("Environment variable {key} is invalid: {reason}")]
    InvalidVariable { key: &'static str, reason: String },

    #[error("Failed to load settings: {0}")]
    Source(#[from] config::ConfigError),
}

/// Remote contract read/write failures
#[derive(Error, Debug)]
pub enum ContractError {
    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Failed to decode {method} response: {reason}")]
    Decode { method: &'static str, reason: String },

    #[error("Transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },

    #[error("Call to {method} failed for campaign {campaign_id}: {reason}")]
    CampaignCall {
        method: &'static str,
        campaign_id: u64,
        reason: String,
    },
}

/// Local input checks that run before any network call
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Donation amount must be greater than 0")]
    NonPositiveAmount,

    #[error("Donation amount cannot exceed campaign goal")]
    AmountExceedsGoal,

    #[error("Invalid amount '{0}'")]
    InvalidAmount(String),

    #[error("Invalid address '{0}'")]
    InvalidAddress(String),

    #[error("No file selected")]
    EmptyFile,

    #[error("File size must be less than 5MB")]
    FileTooLarge,

    #[error("Only JPEG, PNG, GIF, and WebP images are allowed")]
    UnsupportedFileType(String),

    #[error("{0}")]
    InvalidInput(String),
}

/// Price feed and upload service failures
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Price feed unavailable: {0}")]
    PriceUnavailable(String),

    #[error("IPFS upload failed: {0}")]
    UploadFailed(String),
}

/// API error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR"),
            AppError::WalletUnavailable(_) => (StatusCode::CONFLICT, "WALLET_UNAVAILABLE"),
            AppError::Contract(ContractError::Reverted { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "TRANSACTION_REVERTED")
            }
            AppError::Contract(_) => (StatusCode::BAD_GATEWAY, "CONTRACT_CALL_FAILED"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_SERVICE_ERROR"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        let details = match &self {
            AppError::Contract(ContractError::Reverted { tx_hash }) => {
                Some(serde_json::json!({ "tx_hash": tx_hash }))
            }
            AppError::Contract(ContractError::CampaignCall { campaign_id, .. }) => {
                Some(serde_json::json!({ "campaign_id": campaign_id }))
            }
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
