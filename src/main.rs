use std::sync::Arc;
use tokio::sync::watch;

mod config;
mod error;
mod handler;
mod http;
mod logger;
mod relay;
mod server;

#[cfg(test)]
mod testing;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // First argument is the config file path (without extension)
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;
    let state = Arc::new(config::AppState::new(&cfg)?);

    logger::log_server_start(&addr, &cfg);

    // Connections and signal handling run on a LocalSet via spawn_local.
    // The loop returns only after draining, so dropping the set afterwards
    // cancels nothing that is still answering a request.
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async move {
            let (stop, shutdown) = watch::channel(false);
            server::start_signal_handler(stop);
            server::start_server_loop(listener, state, shutdown).await
        })
        .await
}
