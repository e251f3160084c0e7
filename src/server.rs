use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    api::{
        handler::{
            create_campaign, donate, get_campaign, get_donor_nfts, get_donors, get_stats,
            get_wallet, health_check, list_campaigns, list_durations, refresh_campaigns,
            refresh_price, set_wallet, upload_image, withdraw, AppState,
        },
        streaming::stream_ticks,
    },
    middleware::create_cors_layer,
    upload::ipfs::MAX_IMAGE_BYTES,
};

// Room for multipart framing around the largest accepted image
const UPLOAD_BODY_LIMIT: usize = MAX_IMAGE_BYTES + 64 * 1024;

pub async fn create_app(state: AppState, allowed_origins: &[String]) -> Router {
    info!("⚙️ Setting up HTTP routes...");

    let app = Router::new()
        .route("/health", get(health_check))
        .nest(
            "/api/v1",
            Router::new()
                // Campaigns
                .route("/campaigns", get(list_campaigns).post(create_campaign))
                .route("/campaigns/refresh", post(refresh_campaigns))
                .route("/campaigns/:id", get(get_campaign))
                .route("/campaigns/:id/donate", post(donate))
                .route("/campaigns/:id/withdraw", post(withdraw))
                .route("/campaigns/:id/donors", get(get_donors))
                .route("/durations", get(list_durations))
                // Images
                .route(
                    "/uploads",
                    post(upload_image).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
                )
                // Price, wallet, stats
                .route("/price/refresh", post(refresh_price))
                .route("/wallet", get(get_wallet).put(set_wallet))
                .route("/wallet/nfts", get(get_donor_nfts))
                .route("/stats", get(get_stats))
                // Live ticks
                .route("/stream", get(stream_ticks)),
        )
        .layer(CompressionLayer::new())
        .layer(create_cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("✓ HTTP routes configured");
    app
}

pub async fn run_server(app: Router, bind_address: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("🌐 Server listening on: {}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
