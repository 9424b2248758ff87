//! Logging setup for vaultqa.
//!
//! All logs go to stderr; stdout carries command output only.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Install the global tracing subscriber.
///
/// The filter comes from `log_level` when given, otherwise from `RUST_LOG`,
/// otherwise `info`. Color is off when `no_color` is set or `NO_COLOR` is
/// present in the environment.
///
/// # Example
/// ```no_run
/// use vaultqa_core::logging::init_logging;
///
/// init_logging(Some("debug"), false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(log_level: Option<&str>, no_color: bool) -> AppResult<()> {
    let filter_str = resolve_filter(log_level);

    let env_filter = EnvFilter::try_new(&filter_str)
        .map_err(|e| AppError::Config(format!("Invalid log filter '{}': {}", filter_str, e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(!no_color && std::env::var_os("NO_COLOR").is_none());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))?;

    Ok(())
}

fn resolve_filter(log_level: Option<&str>) -> String {
    match log_level {
        Some(level) if !level.trim().is_empty() => level.to_string(),
        _ => std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
    }
}
