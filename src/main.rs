use std::net::SocketAddr;
use std::process::ExitCode;

use dotenvy::dotenv;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use race_registration::config::AppConfig;
use race_registration::database::{self, schema, STARTUP_RETRY_BASE_DELAY};
use race_registration::services::admin_auth_service;
use race_registration::web::{build_router, AppState};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    // 1. Logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info,sqlx=warn")),
        )
        .init();

    // 2. Config
    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if config.admin.uses_default_password() {
        warn!("ADMIN_PASSWORD is not set; the default admin password is in use");
    }

    // 3. Database, schema and admin seed, each retried while the store comes up
    info!("Connecting to database: {}", config.database_url);
    let attempts = config.db_connect_attempts;
    let pool = match database::with_backoff("database connect", attempts, STARTUP_RETRY_BASE_DELAY, || {
        database::open_pool(&config.database_url, config.db_max_connections)
    })
    .await
    {
        Ok(pool) => pool,
        Err(e) => {
            error!("Database unavailable: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = database::with_backoff("schema setup", attempts, STARTUP_RETRY_BASE_DELAY, || {
        schema::apply(&pool)
    })
    .await
    {
        error!("Schema setup failed: {}", e);
        return ExitCode::FAILURE;
    }

    if let Err(e) = database::with_backoff("admin seed", attempts, STARTUP_RETRY_BASE_DELAY, || {
        admin_auth_service::seed_admin(&pool, &config.admin)
    })
    .await
    {
        error!("Admin seed failed: {}", e);
        return ExitCode::FAILURE;
    }

    // 4. App
    let host = config.host.clone();
    let port = config.port;
    let app = build_router(AppState::new(pool, config));

    // 5. Serve (with fallback port)
    let addr: SocketAddr = match format!("{}:{}", host, port).parse() {
        Ok(a) => a,
        Err(e) => {
            error!("Cannot parse HOST/PORT {}:{}: {}", host, port, e);
            return ExitCode::FAILURE;
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            let fallback = SocketAddr::new(addr.ip(), port.saturating_add(1));
            warn!("Could not bind {}: {}. Trying fallback {}", addr, e, fallback);
            match tokio::net::TcpListener::bind(fallback).await {
                Ok(l) => l,
                Err(e) => {
                    error!("Could not bind fallback {}: {}", fallback, e);
                    return ExitCode::FAILURE;
                }
            }
        }
    };

    match listener.local_addr() {
        Ok(bound) => {
            info!("Server running on http://{}", bound);
            info!("Registration form at http://{}/register", bound);
        }
        Err(e) => warn!("Could not read bound address: {}", e),
    }

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
