// =============================================================================
// liqbot: Main Entry Point
// =============================================================================
//
// Polls Binance, MEXC and Coinglass, blends the heuristics into confidence
// scores, pushes Telegram alerts on a fixed tick and answers chat commands
// delivered through the webhook route.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod alerts;
mod analysis;
mod api;
mod app_state;
mod binance;
mod coinglass;
mod commands;
mod feeds;
mod futures_intel;
mod heatmap;
mod market_data;
mod mexc;
mod pairs;
mod report;
mod runtime_config;
mod signals;
mod telegram;
mod tick;
mod types;

#[cfg(test)]
mod test_support;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::analysis::Analyzer;
use crate::app_state::{ApiSecrets, AppState};
use crate::binance::BinanceClient;
use crate::coinglass::CoinglassClient;
use crate::feeds::HeatmapProvider;
use crate::mexc::MexcClient;
use crate::pairs::parse_pair_list;
use crate::runtime_config::RuntimeConfig;
use crate::telegram::TelegramNotifier;

const HTTP_TIMEOUT_SECS: u64 = 10;

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("liqbot starting up");

    let config_path =
        std::env::var("LIQBOT_CONFIG").unwrap_or_else(|_| "liqbot_config.json".into());

    let config = RuntimeConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    let startup_pairs = env_opt("LIQBOT_PAIRS")
        .map(|raw| parse_pair_list(&raw))
        .unwrap_or_default();

    info!(
        pairs = ?config.pairs,
        pairs_override = ?startup_pairs,
        tick_enabled = config.tick_enabled,
        tick_interval_secs = config.tick_interval_secs,
        "Configured pairs"
    );

    // ── 2. Outbound clients ──────────────────────────────────────────────
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .expect("Failed to build HTTP client");

    let coinglass = CoinglassClient::with_client(http.clone(), env_opt("COINGLASS_API"));
    if !coinglass.is_configured() {
        warn!("COINGLASS_API not set, heatmap provider disabled");
    }

    let notifier = TelegramNotifier::with_client(
        http.clone(),
        env_opt("TELEGRAM_TOKEN"),
        env_opt("TELEGRAM_CHAT"),
    );
    if !notifier.is_configured() {
        warn!("TELEGRAM_TOKEN not set, alerts and replies will be dropped");
    }

    let analyzer = Analyzer::new(
        Arc::new(BinanceClient::with_client(http.clone())),
        Arc::new(MexcClient::with_client(http)),
        Arc::new(coinglass),
    );

    // ── 3. Build shared state ────────────────────────────────────────────
    let secrets = ApiSecrets {
        admin_token: env_opt("LIQBOT_ADMIN_TOKEN"),
        webhook_secret: env_opt("TELEGRAM_WEBHOOK_SECRET"),
    };
    if secrets.admin_token.is_none() {
        warn!("LIQBOT_ADMIN_TOKEN not set, admin endpoints will reject every request");
    }

    let state = Arc::new(AppState::new(
        config,
        config_path.clone(),
        secrets,
        analyzer,
        Arc::new(notifier),
    )
    .with_startup_pairs(&startup_pairs));

    // ── 4. Tick loop ─────────────────────────────────────────────────────
    tokio::spawn(tick::run_tick_loop(state.clone()));

    // ── 5. API server ────────────────────────────────────────────────────
    let bind_addr =
        std::env::var("LIQBOT_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "API server listening");

    axum::serve(listener, api::rest::router(state.clone()))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            warn!("Shutdown signal received, stopping gracefully");
        })
        .await?;

    // ── 6. Persist config ────────────────────────────────────────────────
    if let Err(e) = state.config().save(&config_path) {
        error!(error = %e, "Failed to save runtime config on shutdown");
    }

    info!("liqbot shut down complete.");
    Ok(())
}
