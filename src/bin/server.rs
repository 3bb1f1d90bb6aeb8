//! FinTrack Sync Server
//!
//! Serves the record store and the sync protocol over HTTP.
//!
//! # Configuration
//!
//! Environment variables:
//! - `FINTRACK_PORT`: Port to listen on (default: 8080)
//! - `FINTRACK_DATABASE_PATH`: Path to the SQLite database
//!   (default: ~/.local/share/fintrack/fintrack.db)
//! - `FINTRACK_DEV_MODE`: When `1` or `true`, OTP request responses
//!   include the code (no SMS delivery in development)
//!
//! # Endpoints
//!
//! - `GET /health`: Health check (no auth required)
//! - `POST /auth/*`: Phone-number registration and login
//! - `/categories`, `/sources`, `/transactions`, `/budgets`: CRUD (auth required)
//! - `GET /sync/status`, `GET /sync/changes`, `POST /sync`: sync protocol

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fintrack::db::init_db;
use fintrack::server::{app, AppState};

/// Server configuration
#[derive(Debug, Clone)]
struct Config {
    port: u16,
    database_path: PathBuf,
    dev_mode: bool,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let port = std::env::var("FINTRACK_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let database_path = std::env::var("FINTRACK_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("fintrack")
                    .join("fintrack.db")
            });

        let dev_mode = std::env::var("FINTRACK_DEV_MODE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            port,
            database_path,
            dev_mode,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fintrack=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if let Some(parent) = config.database_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::error!("Failed to create data directory: {}", e);
            std::process::exit(1);
        }
    }

    tracing::info!("Database: {}", config.database_path.display());
    if config.dev_mode {
        tracing::warn!("Dev mode enabled: OTP codes are returned in responses");
    }

    let pool = match init_db(Some(config.database_path.clone())).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let state = AppState::new(pool, config.dev_mode);

    // Periodic sweep for expired codes and sessions
    let otp = state.otp.clone();
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            otp.cleanup_expired();
            let removed = sessions.cleanup_expired();
            if removed > 0 {
                tracing::debug!("removed {} expired sessions", removed);
            }
        }
    });

    let router = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
