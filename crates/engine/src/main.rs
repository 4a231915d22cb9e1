//! Slotcast Engine - slot availability and booking backend
//!
//! This binary is the *composition root*: it assembles the SQLite store,
//! the mail relay, the broadcast hub, and the use cases, then starts the
//! HTTP/WebSocket server and the background lifecycle worker.

use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use sqlx::sqlite::SqlitePoolOptions;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slotcast_engine::api::{self, websocket::WsState, ConnectionManager};
use slotcast_engine::app::{App, AppConfig};
use slotcast_engine::infrastructure::clock::SystemClock;
use slotcast_engine::infrastructure::config::ServerConfig;
use slotcast_engine::infrastructure::mailer::{NoopMailer, RelayMailer};
use slotcast_engine::infrastructure::ports::MailerPort;
use slotcast_engine::infrastructure::sqlite::SqliteSlotStore;

/// Creates a task that cancels the token on SIGTERM/SIGINT
fn setup_shutdown_signal(cancel_token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown...");
            }
        }

        cancel_token.cancel();
    });
}

fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.len() == 1 && allowed_origins[0] == "*" {
        tracing::warn!("CORS configured to allow ANY origin - this is insecure for production!");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        tracing::info!("CORS configured for origins: {:?}", allowed_origins);
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slotcast_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Slotcast Engine");

    let cancel_token = CancellationToken::new();
    setup_shutdown_signal(cancel_token.clone());

    // Load configuration
    let config = ServerConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Database: {}", config.database_url);
    tracing::info!("  Provisioning window: {} days", config.provision_days);

    // Connect to SQLite and ensure the schema exists
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(SqliteSlotStore::new(pool, config.store_timeout).await?);

    let mailer: Arc<dyn MailerPort> = match &config.mail {
        Some(mail) => {
            tracing::info!("  Mail relay: {}", mail.relay_url);
            Arc::new(RelayMailer::new(
                &mail.relay_url,
                &mail.relay_token,
                &mail.from_address,
            ))
        }
        None => Arc::new(NoopMailer),
    };

    let connections = Arc::new(ConnectionManager::new());
    let clock = Arc::new(SystemClock);

    let app = Arc::new(App::new(
        store,
        mailer,
        connections.clone(),
        clock,
        AppConfig {
            cache_ttl: config.cache_ttl,
            provision_days: config.provision_days,
        },
    ));

    // The rolling window must exist before we serve traffic; a failed
    // cleanup only leaves extra rows behind, so it is not fatal.
    app.use_cases.provision.execute().await?;
    if let Err(e) = app.use_cases.cleanup.execute().await {
        tracing::error!(error = %e, "Startup slot cleanup failed");
    }

    // Background lifecycle worker: re-provision and clean up periodically
    // so the window keeps rolling while the server runs.
    let lifecycle_worker = {
        let app = app.clone();
        let interval = config.lifecycle_interval;
        let cancel = cancel_token.clone();
        tokio::spawn(async move {
            tracing::info!("Starting slot lifecycle worker");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("Lifecycle worker shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {}
                }
                if let Err(e) = app.use_cases.provision.execute().await {
                    tracing::error!(error = %e, "Periodic slot provisioning failed");
                }
                if let Err(e) = app.use_cases.cleanup.execute().await {
                    tracing::error!(error = %e, "Periodic slot cleanup failed");
                }
            }
        })
    };

    let ws_state = Arc::new(WsState {
        app: app.clone(),
        connections,
    });

    // Build HTTP router
    let router = Router::new()
        .merge(api::http::routes().with_state(app))
        .merge(
            Router::new()
                .route("/ws", get(api::websocket::ws_handler))
                .with_state(ws_state),
        )
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&config.cors_allowed_origins));

    // Start server
    let addr = config.bind_addr()?;
    tracing::info!("Listening on {}", addr);

    let shutdown_token = cancel_token.clone();
    let server = axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(async move {
            shutdown_token.cancelled().await;
            tracing::info!("HTTP server received shutdown signal");
        });

    if let Err(e) = server.await {
        tracing::error!("Server error: {}", e);
    }

    cancel_token.cancel();
    let _ = tokio::time::timeout(std::time::Duration::from_secs(10), lifecycle_worker).await;

    tracing::info!("Slotcast Engine stopped");
    Ok(())
}
