use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Wardmed";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Audit entries older than this are eligible for pruning.
pub const AUDIT_RETENTION_DAYS: i64 = 365;

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    format!("{}=info", env!("CARGO_PKG_NAME"))
}

/// Get the application data directory
/// ~/Wardmed/ on all platforms (user-visible, per design requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Wardmed")
}

/// Get the ward database path
pub fn database_path() -> PathBuf {
    app_data_dir().join("ward.db")
}
