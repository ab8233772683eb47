//! Server configuration loaded from environment variables.

use eanflow_core::ean::DetectionThresholds;

/// Runtime configuration for the API server.
///
/// Every field has a default so a bare environment still boots; production
/// deployments override through environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface the HTTP server binds to.
    pub host: String,
    /// Port the HTTP server listens on.
    pub port: u16,
    /// Allowed CORS origins, comma separated. `*` allows any origin.
    pub cors_origins: String,
    /// Request timeout applied to every route.
    pub request_timeout_secs: u64,
    /// Root directory of the file-backed blob store.
    pub storage_root: String,
    /// Tuning knobs for EAN column detection and the validity gate.
    pub thresholds: DetectionThresholds,
    /// Seconds a session may sit in `converting` before a queue drain
    /// may reclaim it as abandoned.
    pub stale_converting_secs: u64,
    /// Seconds a session may sit in `analyzing_ean` before the listing
    /// flags it as stuck.
    pub stuck_analysis_secs: u64,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse("PORT", 8080),
            cors_origins: env_or("CORS_ORIGINS", "*"),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", 120),
            storage_root: env_or("STORAGE_ROOT", "./storage"),
            thresholds: thresholds_from_env(),
            stale_converting_secs: env_parse("STALE_CONVERTING_SECS", 300),
            stuck_analysis_secs: env_parse("STUCK_ANALYSIS_SECS", 300),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn thresholds_from_env() -> DetectionThresholds {
    let defaults = DetectionThresholds::default();
    DetectionThresholds {
        sample_rows: env_parse("EAN_SAMPLE_ROWS", defaults.sample_rows),
        min_samples: env_parse("EAN_MIN_SAMPLES", defaults.min_samples),
        candidate_ratio: env_parse("EAN_CANDIDATE_RATIO", defaults.candidate_ratio),
        accept_percentage: env_parse("EAN_ACCEPT_PERCENTAGE", defaults.accept_percentage),
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
