//! # EasyDrop Checkout Service
//!
//! Backs the EasyDrop checkout page. A partner business redirects its
//! customer here with the parcel details encoded in the URL; the service
//! keeps the customer's order form, resolves the delivery location and
//! submits the finished order to the EasyDrop gateway.
//!
//! ## Flow
//!
//! 1. **Open**: decode the partner checkout URL into a session
//! 2. **Fill**: contact fields, parcel attributes, map pin or address search
//! 3. **Submit**: validate, send once to the gateway, redirect to the partner

use tracing::info;

use easydrop_checkout::config::Config;
use easydrop_checkout::create_app;
use easydrop_checkout::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "easydrop_checkout=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting EasyDrop checkout service");

    // Missing maps key or gateway URL stops the service here.
    let config = Config::from_env()?;
    info!("Gateway: {}", config.gateway_api_url);
    if config.discard_stale_geocodes {
        info!("Stale geocoding results will be discarded");
    }
    if config.uniform_success_redirect {
        info!("Legacy redirect mode: every outcome reports delivery=success");
    }

    let bind_addr = config.bind_addr.clone();
    let state = AppState::from_config(config)?;
    let app = create_app(state);

    // Bind and serve
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on {}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
