use std::io::Write;
use std::process::ExitCode;

use dotenvy::dotenv;
use tracing::{error, info};

use race_registration::config::AppConfig;
use race_registration::database::{self, schema};
use race_registration::services::export_service;

/// Writes every registrant as CSV to stdout, e.g. `export_registrants > race.csv`.
#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let pool = match database::open_pool(&config.database_url, 1).await {
        Ok(p) => p,
        Err(e) => {
            error!("Database unavailable: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = schema::apply(&pool).await {
        error!("Schema setup failed: {}", e);
        return ExitCode::FAILURE;
    }

    let csv = match export_service::export_registrants_csv(&pool).await {
        Ok(csv) => csv,
        Err(e) => {
            error!("Export failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = stdout.write_all(csv.as_bytes()).and_then(|_| stdout.flush()) {
        error!("Could not write CSV: {}", e);
        return ExitCode::FAILURE;
    }

    info!(bytes = csv.len(), "registrants exported");
    ExitCode::SUCCESS
}
