//! Logger module
//!
//! Provides logging utilities for the relay including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Upstream failure and fallback logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::Config;
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    let level = writer::Level::parse(&config.logging.level).ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("Unknown logging.level '{}'", config.logging.level),
        )
    })?;
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
        level,
    )
}

/// Write to info/access log
fn write_info(message: &str) {
    if writer::is_initialized() {
        writer::get().write_info(message);
    } else {
        println!("{message}");
    }
}

/// Write a warning, dropped when `logging.level` is `error`
fn write_warn(message: &str) {
    if writer::is_initialized() {
        writer::get().write_warn(message);
    } else {
        eprintln!("{message}");
    }
}

/// Write to error log
fn write_error(message: &str) {
    if writer::is_initialized() {
        writer::get().write_error(message);
    } else {
        eprintln!("{message}");
    }
}

/// Write to access log specifically
fn write_access(message: &str) {
    if writer::is_initialized() {
        writer::get().write_access(message);
    } else {
        println!("{message}");
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info("======================================");
    write_info("MOEX relay started");
    write_info(&format!(
        "Listening on: http://{addr}{}",
        if config.server.endpoint == "*" { "/*" } else { config.server.endpoint.as_str() }
    ));
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info(&format!("ISS: {}", config.upstream.iss_base_url));
    write_info(&format!(
        "Instruments: candles={} trades={}",
        config.market.candles_security, config.market.trades_security
    ));
    write_info("======================================\n");
}

pub fn log_shutdown(active: usize) {
    write_info(&format!(
        "[Shutdown] Listener closed, waiting for {active} connection(s)"
    ));
}

/// End of the shutdown drain; `remaining` connections are cut off
pub fn log_drained(remaining: usize) {
    if remaining == 0 {
        write_info("[Shutdown] All connections finished");
    } else {
        write_warn(&format!(
            "[WARN] Shutdown grace period over, dropping {remaining} connection(s)"
        ));
    }
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write_info(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_warn(&format!("[WARN] {message}"));
}

/// Passport login did not produce a cookie; the data request goes out public
pub fn log_auth_fallback(reason: &str) {
    write_warn(&format!(
        "[AUTH] MOEX authentication unavailable ({reason}), using public access"
    ));
}

/// A failure the relay answers with an `{"error": ...}` body
pub fn log_upstream_failure(context: &str, err: &impl std::fmt::Display) {
    write_error(&format!("[UPSTREAM] {context} failed: {err}"));
}

/// A failure the relay downgrades to a soft 200 answer
pub fn log_soft_failure(context: &str, err: &impl std::fmt::Display) {
    write_warn(&format!("[WARN] {context} unavailable, answering fallback: {err}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_access(&entry.format(format));
}
