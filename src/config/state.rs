// Application state module
// Shared, read-only runtime state handed to every connection

use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::sync::Arc;
use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::Client;

use super::types::Config;

/// Application state
pub struct AppState {
    pub config: Config,

    /// Client for data, news and AI calls
    pub client: Client,
    /// Client for the passport call; redirects stay unfollowed so `Set-Cookie` is visible
    pub auth_client: Client,

    // Cached config values for fast access without locks
    pub cached_access_log: Arc<AtomicBool>,

    pub active_connections: Arc<AtomicUsize>,
}

impl AppState {
    /// Create `AppState` and build the outbound HTTP clients
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Self::client_builder(config).build()?;
        let auth_client = Self::client_builder(config)
            .redirect(Policy::none())
            .build()?;

        Ok(Self {
            config: config.clone(),
            client,
            auth_client,
            cached_access_log: Arc::new(AtomicBool::new(config.logging.access_log)),
            active_connections: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn client_builder(config: &Config) -> reqwest::ClientBuilder {
        let mut builder = Client::builder().user_agent(config.upstream.user_agent.clone());
        if !config.upstream.system_proxy {
            builder = builder.no_proxy();
        }
        if let Some(secs) = config.upstream.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder
    }
}
