mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::header;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use marina_api::auth::{AppState, AppStateInner};
use marina_api::routes;
use marina_api::session::SessionManager;
use marina_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "marina_server=debug,marina_api=debug,marina_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Database::open(&config.db_path)?;

    let sessions = SessionManager::new(&config.jwt_secret, config.token_ttl);
    info!("Session tokens valid for {}h", sessions.validity().num_hours());

    let app_state: AppState = Arc::new(AppStateInner {
        db,
        sessions,
        hash_cost: config.hash_cost,
    });

    // Browser clients read the rotated token from the response headers
    let cors = CorsLayer::permissive().expose_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let mut app = routes::router(app_state);
    if let Some(dir) = &config.static_dir {
        if dir.is_dir() {
            info!("Serving static files from {}", dir.display());
        } else {
            warn!("Static directory {} does not exist yet", dir.display());
        }
        app = app.fallback_service(ServeDir::new(dir));
    }

    let app = app.layer(cors).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Marina server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Marina server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
