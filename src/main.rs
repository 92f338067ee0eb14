/*****************************************************************************************
 *
 *  parkwatch – Parking Spot Occupancy Monitor
 *  ------------------------------------------
 *
 *  Sensor ingestion + in-memory latest state + live WebSocket fan-out
 *
 *****************************************************************************************/

use std::path::PathBuf;
use std::process::ExitCode;

use axum::serve;
use tokio::net::TcpListener;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::FmtSubscriber;

use parkwatch::app;
use parkwatch::config::AppConfig;
use parkwatch::state::app::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    //
    // ────────────────────────────────────────────────────────
    //  Load configuration
    // ────────────────────────────────────────────────────────
    //
    let config_path = locate_config();

    let cfg = match AppConfig::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Cannot load configuration from {}: {e}", config_path.display());
            return ExitCode::FAILURE;
        }
    };

    //
    // ────────────────────────────────────────────────────────
    //  Configure logging
    // ────────────────────────────────────────────────────────
    //
    let level = match cfg.log_level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info"  => LevelFilter::INFO,
        "warn"  => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!("Starting parkwatch…");
    if config_path.exists() {
        tracing::info!("Config file: {}", config_path.display());
    } else {
        tracing::info!("No config.json found, using defaults and environment");
    }
    tracing::info!(
        port = cfg.port,
        threshold_cm = cfg.threshold_cm,
        default_spot = %cfg.default_spot,
        subscriber_buffer = cfg.subscriber_buffer,
        static_dir = ?cfg.static_dir,
        "Loaded configuration"
    );

    //
    // ────────────────────────────────────────────────────────
    //  Build shared state and the Axum app
    // ────────────────────────────────────────────────────────
    //
    let port = cfg.port;
    let state = AppState::new(cfg);
    let app = app::build_app(state);

    //
    // ────────────────────────────────────────────────────────
    //  Bind server and start listening
    // ────────────────────────────────────────────────────────
    //
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind {addr}: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("Listening on http://{}", addr);

    if let Err(e) = serve(listener, app).with_graceful_shutdown(shutdown()).await {
        tracing::error!("Server error: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

//
// ─────────────────────────────────────────────────────────────
//  Locate config.json (EXE folder, its parent, or working dir)
// ─────────────────────────────────────────────────────────────
//
fn locate_config() -> PathBuf {
    let fallback = PathBuf::from("config.json");

    let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
    else {
        return fallback;
    };

    [exe_dir.join("config.json"), exe_dir.join("..").join("config.json")]
        .into_iter()
        .find(|p| p.exists())
        .unwrap_or(fallback)
}

//
// ─────────────────────────────────────────────────────────────
//  Graceful shutdown handler
// ─────────────────────────────────────────────────────────────
//
async fn shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }

    tracing::warn!("CTRL+C received, shutting down (in-memory state is discarded)");
}
