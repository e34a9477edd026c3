//! Vaccine slot bot
//!
//! A chat assistant that walks users through finding vaccination
//! appointment availability by district or by postal code.

mod api;
mod config;
mod cowin;
mod formatter;
mod postal;
mod reference;
mod runtime;
mod state_machine;
#[cfg(feature = "telegram")]
mod telegram;

use api::{create_router, AppState};
use config::BotConfig;
use cowin::{CowinClient, LoggingAvailabilityClient};
use postal::{PincodeChecker, PostalClient};
use reference::ReferenceMap;
use runtime::{ConversationRuntime, ProductionRuntime};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vaccine_slot_bot=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = BotConfig::from_env()?;

    let reference = Arc::new(ReferenceMap::load(&config.reference_path)?);
    tracing::info!(
        path = %config.reference_path.display(),
        regions = reference.region_count(),
        "Reference data loaded"
    );

    // External services
    let calendar = CowinClient::new(&config.cowin_base_url, config.http_timeout)?;
    let client = LoggingAvailabilityClient::new(Arc::new(calendar));
    let validator = PincodeChecker::new(PostalClient::new(
        &config.postal_base_url,
        config.http_timeout,
    )?);

    let runtime: Arc<ProductionRuntime> =
        Arc::new(ConversationRuntime::new(reference, validator, client));

    start_telegram(&config, &runtime);
    start_session_sweeper(config.session_timeout, runtime.clone());

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new().gzip(true).br(true);

    let app = create_router(AppState::new(runtime))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Vaccine slot bot listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically forget conversations abandoned mid-way
fn start_session_sweeper(session_timeout: Duration, runtime: Arc<ProductionRuntime>) {
    let period = session_timeout.min(Duration::from_secs(60));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            runtime.evict_idle_sessions(session_timeout).await;
        }
    });
}

#[cfg(feature = "telegram")]
fn start_telegram(config: &BotConfig, runtime: &Arc<ProductionRuntime>) {
    match &config.telegram_token {
        Some(token) => {
            tokio::spawn(telegram::run(token.clone(), runtime.clone()));
        }
        None => tracing::info!("TELEGRAM_BOT_TOKEN not set, Telegram transport disabled"),
    }
}

#[cfg(not(feature = "telegram"))]
fn start_telegram(config: &BotConfig, _runtime: &Arc<ProductionRuntime>) {
    if config.telegram_token.is_some() {
        tracing::warn!("TELEGRAM_BOT_TOKEN is set but the telegram feature is not compiled in");
    }
}
