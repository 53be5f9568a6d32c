//! Anonymous single-choice poll server.
//!
//!
//!
//! # General Flow
//! - Every API request resolves the voter id from the `voterId` cookie, issuing one if needed
//! - Vote submissions pass the per-origin rate limiter first
//! - Accepted votes are written to the ledger file before the response goes out
//! - Both endpoints answer with the same tally snapshot
//!
//!
//!
//! # Endpoints
//!
//! | Method | Path           | Body                 | Response                                  |
//! |--------|----------------|----------------------|-------------------------------------------|
//! | GET    | `/api/results` |                      | 200 snapshot                              |
//! | POST   | `/api/vote`    | `{"option": "<id>"}` | 200 snapshot, 400 / 429 `{"error": "..."}` |
//! | GET    | `/`, `/result` |                      | static pages from `STATIC_DIR`            |
//!
//! Snapshot:
//! ```json
//! {
//!   "total": 2,
//!   "options": [{ "id": "jjajangmyeon", "label": "짜장면", "count": 1, "percent": 50 }],
//!   "userVote": "jjajangmyeon",
//!   "updatedAt": "2025-11-14T08:30:00.000Z"
//! }
//! ```
//!
//!
//!
//! # Configuration
//!
//! | Variable                 | Default     |
//! |--------------------------|-------------|
//! | `PORT`                   | `3000`      |
//! | `DATA_PATH`              | `data.json` |
//! | `STATIC_DIR`             | `public`    |
//! | `APP_ENV`                | unset, `production` marks cookies Secure |
//! | `RATE_LIMIT_WINDOW_SECS` | `60`        |
//! | `RATE_LIMIT_MAX`         | `12`        |
//! | `RUST_LOG`               | log filter  |
//!
//!
//!
//! # Notes
//!
//! ## Durability
//! The ledger file is replaced through a temp file and a rename, so a crash mid-write leaves
//! the previous document intact. A missing or unreadable file is reseeded at startup.
//!
//! ## Percentages
//! Each option is rounded on its own. Three equal options show 33/33/33.
use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    routing::{get, post},
};
use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod store;
pub mod tally;
pub mod utils;

use config::Config;
use routes::{results_handler, vote_handler};
use state::AppState;

pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::new(config).await?;

    info!("Starting server...");
    let app = app(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Poll server running on http://localhost:{}", state.config.port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shut down");
    Ok(())
}

pub fn app(state: Arc<AppState>) -> Router {
    let static_dir = &state.config.static_dir;

    Router::new()
        .route("/api/results", get(results_handler))
        .route("/api/vote", post(vote_handler))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .route_service("/result", ServeFile::new(static_dir.join("result.html")))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
