use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use super::models::*;
use crate::{
    campaign::{amount, CampaignId, CampaignView, DurationPreset, NewCampaign, DURATION_PRESETS},
    contract::{abi, CampaignWriter, WalletProvider},
    error::{AppError, AppResult, ValidationError},
    middleware::ValidatedJson,
    reconcile::{Clock, Dashboard, ReconciliationEngine, WalletContext},
    upload::{ImageFile, ImageUploader, UploadResult},
};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReconciliationEngine>,
    pub uploader: Arc<dyn ImageUploader>,
    // Accounts the node can sign for, and the signer used for them
    pub wallets: Arc<dyn WalletProvider>,
    pub signer: Arc<dyn CampaignWriter>,
    pub clock: Arc<dyn Clock>,
    pub ticks: watch::Receiver<Arc<Dashboard>>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.engine.snapshot();
    Json(HealthResponse {
        status: if snapshot.fetched_at.is_some() {
            "healthy".to_string()
        } else {
            "starting".to_string()
        },
        timestamp: Utc::now(),
        campaigns_loaded: snapshot.records.len(),
        snapshot_fetched_at: snapshot.fetched_at,
        price_available: state.engine.price().is_some(),
    })
}

/// GET /campaigns - dashboard at the current instant
pub async fn list_campaigns(State(state): State<AppState>) -> Json<Dashboard> {
    Json(state.engine.derive(state.clock.now()))
}

/// GET /campaigns/:id
pub async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<CampaignId>,
) -> AppResult<Json<CampaignView>> {
    Ok(Json(state.engine.view(id, state.clock.now())?))
}

/// POST /campaigns/refresh
pub async fn refresh_campaigns(State(state): State<AppState>) -> AppResult<Json<Dashboard>> {
    state.engine.refresh().await?;
    Ok(Json(state.engine.derive(state.clock.now())))
}

/// POST /campaigns
pub async fn create_campaign(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateCampaignRequest>,
) -> AppResult<Json<TxResponse>> {
    info!("📝 Creating campaign '{}'", request.title);

    let campaign = NewCampaign {
        goal: amount::parse_ether(&request.goal)?,
        title: request.title,
        duration_seconds: request.duration_seconds,
        story: request.story,
        image_url: request.image_url,
    };
    let outcome = state.engine.create_campaign(campaign).await?;

    Ok(Json(TxResponse {
        outcome,
        message: "Campaign created successfully!".to_string(),
    }))
}

/// POST /campaigns/:id/donate
pub async fn donate(
    State(state): State<AppState>,
    Path(id): Path<CampaignId>,
    ValidatedJson(request): ValidatedJson<DonateRequest>,
) -> AppResult<Json<TxResponse>> {
    let goal = request
        .goal
        .as_deref()
        .map(|goal| {
            amount::parse_ether(goal).map_err(|_| {
                ValidationError::InvalidInput(format!("Invalid campaign goal '{}'", goal))
            })
        })
        .transpose()?;

    let outcome = state.engine.donate_ether(id, &request.amount, goal).await?;

    Ok(Json(TxResponse {
        outcome,
        message: "Donation successful!".to_string(),
    }))
}

/// POST /campaigns/:id/withdraw
pub async fn withdraw(
    State(state): State<AppState>,
    Path(id): Path<CampaignId>,
) -> AppResult<Json<TxResponse>> {
    let outcome = state.engine.withdraw(id).await?;

    Ok(Json(TxResponse {
        outcome,
        message: "Funds withdrawn successfully!".to_string(),
    }))
}

/// GET /campaigns/:id/donors
pub async fn get_donors(
    State(state): State<AppState>,
    Path(id): Path<CampaignId>,
) -> AppResult<Json<DonorsResponse>> {
    let donors = state.engine.expand_donors(id).await?;
    Ok(Json(DonorsResponse {
        campaign_id: id,
        donors,
    }))
}

/// GET /durations
pub async fn list_durations() -> Json<Vec<DurationPreset>> {
    Json(DURATION_PRESETS.to_vec())
}

/// POST /uploads - multipart with a single `file` field
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResult>> {
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ValidationError::InvalidInput(format!("Invalid upload: {}", e.body_text())))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("image").to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ValidationError::InvalidInput(format!("Invalid upload: {}", e.body_text())))?;

        image = Some(ImageFile {
            name,
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let image = image.ok_or(ValidationError::EmptyFile)?;
    info!("📤 Uploading image '{}' ({} bytes)", image.name, image.bytes.len());

    let result = state.uploader.upload(image).await?;
    info!("✅ Image pinned: {}", result.cid);
    Ok(Json(result))
}

/// POST /price/refresh
pub async fn refresh_price(State(state): State<AppState>) -> AppResult<Json<PriceResponse>> {
    Ok(Json(state.engine.refresh_price().await?.into()))
}

/// GET /wallet
pub async fn get_wallet(State(state): State<AppState>) -> Json<WalletResponse> {
    Json(WalletResponse {
        account: state.engine.account(),
    })
}

/// PUT /wallet - account changed or disconnected
pub async fn set_wallet(
    State(state): State<AppState>,
    Json(request): Json<WalletRequest>,
) -> AppResult<Json<WalletResponse>> {
    let account = match request.account {
        Some(account) => {
            abi::parse_address(&account)?;
            let known = state.wallets.accounts().await?;
            if !known.iter().any(|a| a.eq_ignore_ascii_case(&account)) {
                warn!("⚠️ Account {} is not available on the node", account);
                return Err(AppError::WalletUnavailable(format!(
                    "Account {} is not available for signing",
                    account
                )));
            }
            Some(account)
        }
        None => None,
    };

    let wallet = account
        .clone()
        .map(|a| WalletContext::new(a, state.signer.clone()));
    state.engine.set_wallet(wallet);

    Ok(Json(WalletResponse { account }))
}

/// GET /wallet/nfts
pub async fn get_donor_nfts(State(state): State<AppState>) -> AppResult<Json<NftResponse>> {
    let ids = state.engine.donor_nfts().await?;
    let account = state.engine.account().unwrap_or_default();

    Ok(Json(NftResponse {
        account,
        token_ids: ids.iter().map(|id| id.to_string()).collect(),
    }))
}

/// GET /stats
pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let dashboard = state.engine.derive(state.clock.now());
    let total_wei = state.engine.snapshot().total_funds_raised;

    Json(StatsResponse {
        total_funds_raised_eth: dashboard.total_funds_raised_eth,
        total_funds_raised_usd: total_wei.and_then(|w| amount::usd_value(w, dashboard.price_usd)),
        campaign_count: dashboard.campaigns.len(),
        active_count: dashboard.campaigns.active.len(),
        ended_count: dashboard.campaigns.ended.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::amount::WEI_PER_ETH;
    use crate::contract::memory::InMemoryContract;
    use crate::price::price_cache::tests::ScriptedFeed;
    use crate::price::PriceCache;
    use crate::reconcile::derive::tests::{NOW, OWNER};
    use crate::reconcile::{FixedClock, TickScheduler};
    use crate::server::create_app;
    use crate::upload::validate_file;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use tokio::time::Duration;
    use tower::ServiceExt;

    const DONOR: &str = "0x00000000000000000000000000000000000000bb";

    struct StaticUploader;

    #[async_trait]
    impl ImageUploader for StaticUploader {
        async fn upload(&self, file: ImageFile) -> AppResult<UploadResult> {
            validate_file(&file)?;
            Ok(UploadResult::from_cid("bafytest"))
        }
    }

    async fn app_with(contract: Arc<InMemoryContract>, account: Option<&str>) -> Router {
        let engine = Arc::new(ReconciliationEngine::new(
            contract.clone(),
            contract.clone(),
            Arc::new(PriceCache::new(Arc::new(ScriptedFeed::new(vec![Some(dec!(2000))])))),
            account.map(|a| WalletContext::new(a, contract.clone())),
        ));
        engine.refresh().await.unwrap();
        engine.refresh_price().await.unwrap();

        let clock = Arc::new(FixedClock::new(NOW));
        let ticks = TickScheduler::new(engine.clone(), clock.clone(), Duration::from_secs(1));
        let state = AppState {
            engine,
            uploader: Arc::new(StaticUploader),
            wallets: contract.clone(),
            signer: contract,
            clock,
            ticks: ticks.subscribe(),
        };
        create_app(state, &["http://localhost:5173".to_string()]).await
    }

    fn seeded() -> Arc<InMemoryContract> {
        let contract = Arc::new(InMemoryContract::new(NOW));
        contract.add_campaign(OWNER, WEI_PER_ETH, WEI_PER_ETH / 2, NOW + 120, true);
        contract.add_campaign(OWNER, WEI_PER_ETH, 0, NOW - 1, true);
        contract.add_account(DONOR);
        contract.add_account(OWNER);
        contract
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(app_with(seeded(), None).await, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["campaigns_loaded"], 2);
        assert_eq!(body["price_available"], true);
    }

    #[tokio::test]
    async fn test_list_campaigns_partitions() {
        let (status, body) = send(app_with(seeded(), None).await, get("/api/v1/campaigns")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["active"][0]["id"], 1);
        assert_eq!(body["active"][0]["time_remaining_label"], "2m 0s");
        assert_eq!(body["active"][0]["raised_amount"], "500000000000000000");
        assert_eq!(body["ended"][0]["id"], 2);
        assert_eq!(body["ended"][0]["time_remaining_label"], "Ended");
    }

    #[tokio::test]
    async fn test_unknown_campaign_is_404() {
        let (status, body) = send(app_with(seeded(), None).await, get("/api/v1/campaigns/42")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error_code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_donate_over_goal_is_400() {
        let contract = seeded();
        let app = app_with(contract.clone(), Some(DONOR)).await;
        let request = json_request("POST", "/api/v1/campaigns/1/donate", json!({ "amount": "2" }));

        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "VALIDATION_ERROR");
        assert_eq!(contract.writes(), 0);
    }

    #[tokio::test]
    async fn test_donate_with_zero_goal_reports_goal() {
        let contract = seeded();
        let app = app_with(contract.clone(), Some(DONOR)).await;
        let request = json_request(
            "POST",
            "/api/v1/campaigns/1/donate",
            json!({ "amount": "0.1", "goal": "0" }),
        );

        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid campaign goal '0'");
        assert_eq!(contract.writes(), 0);
    }

    #[tokio::test]
    async fn test_donate_without_wallet_is_409() {
        let app = app_with(seeded(), None).await;
        let request = json_request("POST", "/api/v1/campaigns/1/donate", json!({ "amount": "0.1" }));

        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error_code"], "WALLET_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_donate_success() {
        let contract = seeded();
        let app = app_with(contract.clone(), Some(DONOR)).await;
        let request = json_request("POST", "/api/v1/campaigns/1/donate", json!({ "amount": "0.25" }));

        let (status, body) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Donation successful!");
        assert!(body["tx_hash"].as_str().unwrap().starts_with("0x"));

        let (_, donors) = send(app, get("/api/v1/campaigns/1/donors")).await;
        assert_eq!(donors["donors"][0]["address"], DONOR);
        assert_eq!(donors["donors"][0]["amount"], "250000000000000000");
    }

    #[tokio::test]
    async fn test_donate_to_ended_campaign_is_502() {
        let app = app_with(seeded(), Some(DONOR)).await;
        let request = json_request("POST", "/api/v1/campaigns/2/donate", json!({ "amount": "0.1" }));

        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error_code"], "CONTRACT_CALL_FAILED");
        assert_eq!(body["details"]["campaign_id"], 2);
    }

    #[tokio::test]
    async fn test_create_campaign_validation() {
        let contract = seeded();
        let app = app_with(contract.clone(), Some(OWNER)).await;
        let request = json_request(
            "POST",
            "/api/v1/campaigns",
            json!({
                "title": "",
                "goal": "1",
                "duration_seconds": 120,
                "story": "s",
                "image_url": "https://gateway.pinata.cloud/ipfs/bafytest"
            }),
        );

        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Title is required"));
        assert_eq!(contract.writes(), 0);
    }

    #[tokio::test]
    async fn test_create_campaign() {
        let app = app_with(seeded(), Some(OWNER)).await;
        let request = json_request(
            "POST",
            "/api/v1/campaigns",
            json!({
                "title": "Well",
                "goal": "3.5",
                "duration_seconds": 900,
                "story": "Clean water",
                "image_url": "https://gateway.pinata.cloud/ipfs/bafytest"
            }),
        );

        let (status, _) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(app, get("/api/v1/campaigns/3")).await;
        assert_eq!(body["title"], "Well");
        assert_eq!(body["goal"], "3500000000000000000");
        assert_eq!(body["time_remaining_label"], "15m 0s");
    }

    #[tokio::test]
    async fn test_wallet_switch() {
        let app = app_with(seeded(), None).await;

        let request = json_request("PUT", "/api/v1/wallet", json!({ "account": "0x1234" }));
        let (status, _) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let stranger = "0x00000000000000000000000000000000000000cc";
        let request = json_request("PUT", "/api/v1/wallet", json!({ "account": stranger }));
        let (status, _) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let request = json_request("PUT", "/api/v1/wallet", json!({ "account": OWNER }));
        let (status, body) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["account"], OWNER);

        let (_, view) = send(app.clone(), get("/api/v1/campaigns/2")).await;
        assert_eq!(view["can_withdraw"], true);

        let request = json_request("PUT", "/api/v1/wallet", json!({ "account": null }));
        send(app.clone(), request).await;
        let (_, wallet) = send(app, get("/api/v1/wallet")).await;
        assert_eq!(wallet["account"], Value::Null);
    }

    #[tokio::test]
    async fn test_stats_and_durations() {
        let app = app_with(seeded(), None).await;

        let (_, stats) = send(app.clone(), get("/api/v1/stats")).await;
        assert_eq!(stats["campaign_count"], 2);
        assert_eq!(stats["active_count"], 1);
        assert_eq!(stats["total_funds_raised_usd"], 1000.0);

        let (_, durations) = send(app, get("/api/v1/durations")).await;
        assert_eq!(durations.as_array().unwrap().len(), DURATION_PRESETS.len());
        assert_eq!(durations[0]["seconds"], 120);
    }

    fn upload_request(filename: &str, content_type: &str, payload: &[u8]) -> Request<Body> {
        let boundary = "XBOUNDARY";
        let mut body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: {t}\r\n\r\n",
            b = boundary,
            f = filename,
            t = content_type
        )
        .into_bytes();
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/v1/uploads")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_rejects_wrong_type() {
        let app = app_with(seeded(), None).await;
        let request = upload_request("a.txt", "text/plain", b"hello");

        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_upload_png() {
        let app = app_with(seeded(), None).await;
        let request = upload_request("a.png", "image/png", b"\x89PNG");

        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cid"], "bafytest");
    }

    #[tokio::test]
    async fn test_upload_above_default_body_limit() {
        let app = app_with(seeded(), None).await;
        // 3 MB: over axum's 2 MB default, under the 5 MB image cap
        let payload = vec![0u8; 3 * 1024 * 1024];
        let request = upload_request("large.jpg", "image/jpeg", &payload);

        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cid"], "bafytest");
    }
}
