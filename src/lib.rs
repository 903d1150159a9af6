pub mod config;
pub mod models;
pub mod db;
pub mod schedule; // dose-window evaluation (pure)
pub mod roster; // patient registration & directory
pub mod prescribe; // pharmacist prescribing
pub mod rounds; // nurse dashboard & administration recording
pub mod audit; // audit trail views

use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use db::DatabaseError;

/// Initialize tracing and open the ward database, creating the data
/// directory on first run. Call once at application startup; the embedding
/// shell owns the connection from here on.
pub fn init() -> Result<Connection, DatabaseError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    std::fs::create_dir_all(config::app_data_dir())?;
    db::open_database(&config::database_path())
}
