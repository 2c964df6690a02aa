// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub upstream: UpstreamConfig,
    pub market: MarketConfig,
    pub news: NewsConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path the relay answers on; `*` accepts every path
    pub endpoint: String,
    pub workers: Option<usize>,
}

impl ServerConfig {
    pub fn matches_endpoint(&self, path: &str) -> bool {
        self.endpoint == "*" || self.endpoint == path
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    /// Zero disables keep-alive
    pub keep_alive_timeout: u64,
    /// Bound on receiving request headers, idle keep-alive waits included.
    /// Request handling and outbound calls are not covered.
    pub read_timeout: u64,
    /// How long shutdown waits for in-flight connections
    pub shutdown_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub max_body_size: u64,
    /// Health check configuration
    #[serde(default)]
    pub health: HealthConfig,
}

/// Health check configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HealthConfig {
    /// Answer `GET` on the probe paths instead of 405 (off by default)
    #[serde(default = "default_health_enabled")]
    pub enabled: bool,
    /// Liveness probe path (default: /healthz)
    #[serde(default = "default_healthz_path")]
    pub liveness_path: String,
    /// Readiness probe path (default: /readyz)
    #[serde(default = "default_readyz_path")]
    pub readiness_path: String,
}

#[allow(clippy::missing_const_for_fn)]
fn default_health_enabled() -> bool {
    false
}

#[allow(clippy::missing_const_for_fn)]
fn default_healthz_path() -> String {
    "/healthz".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_readyz_path() -> String {
    "/readyz".to_string()
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: default_health_enabled(),
            liveness_path: default_healthz_path(),
            readiness_path: default_readyz_path(),
        }
    }
}

impl HealthConfig {
    pub fn is_probe(&self, path: &str) -> bool {
        self.enabled && (path == self.liveness_path || path == self.readiness_path)
    }
}

/// Outbound endpoints
#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    /// MOEX passport authentication endpoint (Basic auth, answers with `Set-Cookie`)
    pub passport_url: String,
    /// ISS root, without trailing slash
    pub iss_base_url: String,
    pub news_url: String,
    /// Chat-completion endpoint the AI mode forwards to
    pub ai_url: String,
    pub user_agent: String,
    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` from the environment
    pub system_proxy: bool,
    /// Per-call timeout; the only bound on outbound calls, unset by default
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Instrument selection and market-data request validation
#[derive(Debug, Deserialize, Clone)]
pub struct MarketConfig {
    /// FORTS contract used for candles
    pub candles_security: String,
    /// FORTS contract used for the last-trade lookup
    pub trades_security: String,
    pub default_interval: u32,
    /// Name of the session cookie issued by the passport
    pub auth_cookie: String,
    /// Reject market-data requests without `from`/`till` with 400
    pub require_date_range: bool,
    /// Reject market-data requests without `username`/`password` with 400
    pub require_credentials: bool,
}

/// RSS news feed query
#[derive(Debug, Deserialize, Clone)]
pub struct NewsConfig {
    pub query: String,
    pub hl: String,
    pub gl: String,
    pub ceid: String,
    /// Number of `<title>` elements read from the feed, channel title included
    pub max_titles: usize,
}
