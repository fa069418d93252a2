use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "WardTriage";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default remote FHIR R4 endpoint (public SMART sandbox).
pub const DEFAULT_FHIR_BASE: &str = "https://r4.smarthealthit.org";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
/// Number of source rows pushed to the remote service per publish run.
pub const DEFAULT_SAMPLE_SIZE: usize = 5;

/// Fixed ward capacities. Not derived from data.
pub const REGULAR_WARD_CAPACITY: u32 = 50;
pub const SEMI_INTENSIVE_CAPACITY: u32 = 20;
pub const INTENSIVE_CARE_CAPACITY: u32 = 10;
pub const TOTAL_CAPACITY: u32 = 80;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "ward_triage=info,tower_http=info"
}

/// Get the application data directory
/// ~/WardTriage/ on all platforms, falling back to the working directory.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default SQLite database location.
pub fn database_path() -> PathBuf {
    app_data_dir().join("ward_triage.db")
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub fhir_base: String,
    pub db_path: PathBuf,
    pub bind_addr: String,
    pub http_timeout: Duration,
    pub sample_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            fhir_base: DEFAULT_FHIR_BASE.to_string(),
            db_path: database_path(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

impl AppConfig {
    /// Build from `WARD_TRIAGE_*` environment variables, defaulting each one.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let http_timeout = lookup("WARD_TRIAGE_HTTP_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.http_timeout);

        let sample_size = lookup("WARD_TRIAGE_SAMPLE_SIZE")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.sample_size);

        Self {
            fhir_base: lookup("WARD_TRIAGE_FHIR_BASE").unwrap_or(defaults.fhir_base),
            db_path: lookup("WARD_TRIAGE_DB")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            bind_addr: lookup("WARD_TRIAGE_BIND").unwrap_or(defaults.bind_addr),
            http_timeout,
            sample_size,
        }
    }
}
