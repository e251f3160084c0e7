use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::{
    api::handler::AppState,
    config::Config,
    contract::{EvmCampaignContract, RpcClient, WalletProvider},
    error::AppResult,
    price::{CoinGeckoFeed, PriceCache},
    reconcile::{ReconciliationEngine, SystemClock, TickScheduler, WalletContext},
    upload::PinataUploader,
};

/// Application state plus the background tick task
pub struct App {
    pub state: AppState,
    pub ticker: JoinHandle<()>,
}

pub async fn initialize_app_state(config: &Config) -> AppResult<App> {
    info!("Initializing application components ...");

    // Contract gateway
    let rpc = Arc::new(RpcClient::new(&config.rpc_url));
    let contract = Arc::new(EvmCampaignContract::new(
        rpc,
        &config.contract_address,
        &config.nft_contract_address,
        config.receipt_poll_interval,
    ));
    info!(
        "✅ Campaign contract {} via {}",
        config.contract_address, config.rpc_url
    );

    // Price feed
    let feed = Arc::new(CoinGeckoFeed::new(
        &config.price_api_url,
        &config.price_currency_id,
    ));
    let prices = Arc::new(PriceCache::new(feed));
    info!("✅ Price feed initialized for {}", config.price_currency_id);

    // Image uploads
    let uploader = Arc::new(PinataUploader::new(
        &config.pinata_upload_url,
        &config.pinata_api_key,
        &config.pinata_secret_key,
    ));
    info!("✅ Pinata uploader initialized");

    let wallet = match &config.wallet_address {
        Some(account) => connect_wallet(contract.as_ref(), account).await.map(|account| {
            WalletContext::new(account, contract.clone())
        }),
        None => {
            warn!("⚠️  WALLET_ADDRESS not set - donations and withdrawals disabled until a wallet connects");
            None
        }
    };

    let engine = Arc::new(ReconciliationEngine::new(
        contract.clone(),
        contract.clone(),
        prices,
        wallet,
    ));

    // Initial load; the dashboard starts empty if the node is unreachable
    if let Err(e) = engine.refresh().await {
        error!("❌ Initial campaign load failed: {}", e);
    }
    if engine.refresh_price().await.is_err() {
        warn!("⚠️  No USD price at startup - USD values hidden");
    }

    let clock = Arc::new(SystemClock);
    let scheduler = TickScheduler::new(engine.clone(), clock.clone(), config.tick_interval);
    let ticks = scheduler.subscribe();
    scheduler.tick_once();
    let ticker = scheduler.start();

    let state = AppState {
        engine,
        uploader,
        wallets: contract.clone(),
        signer: contract,
        clock,
        ticks,
    };

    Ok(App { state, ticker })
}

/// Check the configured account is one the node can sign for
async fn connect_wallet(wallets: &dyn WalletProvider, account: &str) -> Option<String> {
    let accounts = match wallets.accounts().await {
        Ok(accounts) => accounts,
        Err(e) => {
            error!("❌ Could not list node accounts: {}", e);
            return None;
        }
    };

    if accounts.iter().any(|a| a.eq_ignore_ascii_case(account)) {
        info!("👛 Wallet connected: {}", account);
        Some(account.to_string())
    } else {
        warn!("⚠️  WALLET_ADDRESS {} is not managed by the node - wallet disabled", account);
        None
    }
}
