use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{AppResult, UpstreamError, ValidationError};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

const PRIMARY_GATEWAY: &str = "https://gateway.pinata.cloud/ipfs";
const BACKUP_GATEWAY: &str = "https://ipfs.io/ipfs";

/// An image received from the create-campaign form
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Where a pinned image can be fetched from
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UploadResult {
    pub cid: String,
    pub ipfs_url: String,
    pub backup_url: String,
}

impl UploadResult {
    pub fn from_cid(cid: impl Into<String>) -> Self {
        let cid = cid.into();
        Self {
            ipfs_url: format!("{}/{}", PRIMARY_GATEWAY, cid),
            backup_url: format!("{}/{}", BACKUP_GATEWAY, cid),
            cid,
        }
    }
}

/// Size and MIME checks, run before any network call
pub fn validate_file(file: &ImageFile) -> Result<(), ValidationError> {
    if file.bytes.is_empty() {
        return Err(ValidationError::EmptyFile);
    }
    if file.bytes.len() > MAX_IMAGE_BYTES {
        return Err(ValidationError::FileTooLarge);
    }
    if !ALLOWED_IMAGE_TYPES.contains(&file.content_type.as_str()) {
        return Err(ValidationError::UnsupportedFileType(file.content_type.clone()));
    }
    Ok(())
}

#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(&self, file: ImageFile) -> AppResult<UploadResult>;
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: Option<String>,
}

/// Pinata `pinFileToIPFS` client
pub struct PinataUploader {
    client: Client,
    endpoint: String,
    api_key: String,
    secret_key: String,
}

impl PinataUploader {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            secret_key: secret_key.into(),
        }
    }

    fn form(file: ImageFile) -> AppResult<multipart::Form> {
        let metadata = serde_json::json!({
            "name": file.name,
            "keyvalues": { "type": "fundraiser-image" }
        });
        let part = multipart::Part::bytes(file.bytes)
            .file_name(file.name)
            .mime_str(&file.content_type)
            .map_err(|e| ValidationError::UnsupportedFileType(e.to_string()))?;

        Ok(multipart::Form::new()
            .part("file", part)
            .text("pinataOptions", r#"{"cidVersion":1}"#)
            .text("pinataMetadata", metadata.to_string()))
    }
}

#[async_trait]
impl ImageUploader for PinataUploader {
    async fn upload(&self, file: ImageFile) -> AppResult<UploadResult> {
        validate_file(&file)?;
        let name = file.name.clone();

        let response = self
            .client
            .post(&self.endpoint)
            .header("pinata_api_key", &self.api_key)
            .header("pinata_secret_api_key", &self.secret_key)
            .multipart(Self::form(file)?)
            .send()
            .await
            .map_err(|e| UpstreamError::UploadFailed(e.to_string()))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("❌ IPFS upload of {} failed: {}", name, body);
            return Err(UpstreamError::UploadFailed(body).into());
        }

        let pinned: PinResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::UploadFailed(e.to_string()))?;

        let cid = pinned
            .ipfs_hash
            .filter(|h| !h.is_empty())
            .ok_or_else(|| UpstreamError::UploadFailed("no valid response".to_string()))?;

        info!("📌 Pinned {} as {}", name, cid);
        Ok(UploadResult::from_cid(cid))
    }
}
