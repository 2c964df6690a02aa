// Configuration module entry point
// Loads layered configuration and holds the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, MarketConfig};

/// Default config file, resolved by the `config` crate without extension
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("RELAY")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.endpoint", "/api/proxy")?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.shutdown_timeout", 30)?
            .set_default("http.server_name", "moex-relay/0.1")?
            .set_default("http.max_body_size", 1_048_576)? // 1MB
            .set_default("upstream.passport_url", "https://passport.moex.com/authenticate")?
            .set_default("upstream.iss_base_url", "https://iss.moex.com/iss")?
            .set_default("upstream.news_url", "https://news.google.com/rss/search")?
            .set_default("upstream.ai_url", "https://api.deepseek.com/chat/completions")?
            .set_default("upstream.user_agent", "moex-relay/0.1")?
            .set_default("upstream.system_proxy", true)?
            .set_default("market.candles_security", "Si-3.26")?
            .set_default("market.trades_security", "SiH6")?
            .set_default("market.default_interval", 60)?
            .set_default("market.auth_cookie", "MicexPassportCert")?
            .set_default("market.require_date_range", true)?
            .set_default("market.require_credentials", false)?
            .set_default("news.query", "курс доллара рубль")?
            .set_default("news.hl", "ru")?
            .set_default("news.gl", "RU")?
            .set_default("news.ceid", "RU:ru")?
            .set_default("news.max_titles", 10)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Defaults only: the file is optional and no RELAY_* variables are set in tests
    fn defaults() -> Config {
        Config::load_from("nonexistent-relay-config").expect("defaults should deserialize")
    }

    #[test]
    fn test_defaults_load_without_file() {
        let cfg = defaults();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.endpoint, "/api/proxy");
        assert_eq!(cfg.market.default_interval, 60);
        assert_eq!(cfg.market.auth_cookie, "MicexPassportCert");
        assert!(cfg.market.require_date_range);
        assert!(!cfg.market.require_credentials);
        assert_eq!(cfg.news.max_titles, 10);
        assert!(cfg.upstream.timeout_secs.is_none());
        assert!(!cfg.http.health.enabled);
        assert_eq!(cfg.performance.shutdown_timeout, 30);
    }

    #[test]
    fn test_socket_addr() {
        let cfg = defaults();
        let addr = cfg.get_socket_addr().unwrap();
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_endpoint_matching() {
        let mut cfg = defaults();
        assert!(cfg.server.matches_endpoint("/api/proxy"));
        assert!(!cfg.server.matches_endpoint("/other"));
        cfg.server.endpoint = "*".to_string();
        assert!(cfg.server.matches_endpoint("/other"));
    }

    #[test]
    fn test_health_probe_paths() {
        let mut health = types::HealthConfig::default();
        assert!(!health.is_probe("/healthz"));
        health.enabled = true;
        assert!(health.is_probe("/healthz"));
        assert!(health.is_probe("/readyz"));
        assert!(!health.is_probe("/api/proxy"));
        health.enabled = false;
        assert!(!health.is_probe("/healthz"));
    }
}
