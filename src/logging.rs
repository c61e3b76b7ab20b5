//! Logging configuration for PatientRAG

use std::path::Path;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::{
    self,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Registry;

use crate::Result;

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "patientrag.log";

/// Initialize logging from the `[logging]` section when available
pub fn init_logging_with_config(config: Option<&crate::config::AppConfig>) -> Result<()> {
    let env_filter = match config {
        Some(config) => build_filter(&config.logging.level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,patientrag=debug")),
    };
    install(env_filter)?;

    if let Some(config) = config {
        let current = std::env::var("RUST_BACKTRACE").ok();
        if let Some(value) = backtrace_override(config.logging.backtrace, current.as_deref()) {
            std::env::set_var("RUST_BACKTRACE", value);
        }
    }

    let level = config.map_or("info", |c| c.logging.level.as_str());
    tracing::info!("Logging initialized with level: {}", level);
    tracing::info!("Log files will be saved to: {}/{}.YYYY-MM-DD", LOG_DIR, LOG_FILE);
    Ok(())
}

/// Initialize logging with an explicit level, e.g. `debug` for `--verbose`
pub fn init_logging_with_level(level: &str) -> Result<()> {
    install(build_filter(level))?;
    tracing::info!("Logging initialized with level: {}", level);
    Ok(())
}

/// Initialize simple stderr logging for tests and one-shot commands
pub fn init_simple_logging() -> Result<()> {
    // A second initialization in the same process is harmless
    let _ = tracing_subscriber::fmt()
        .with_target(true)
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .try_init();
    Ok(())
}

/// `logging.backtrace` turns on `RUST_BACKTRACE` unless the caller already set it
fn backtrace_override(enabled: bool, current: Option<&str>) -> Option<&'static str> {
    match (enabled, current) {
        (true, None) => Some("1"),
        _ => None,
    }
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("{level},patientrag={level}"))
}

fn install(env_filter: EnvFilter) -> Result<()> {
    let logs_dir = Path::new(LOG_DIR);
    if !logs_dir.exists() {
        std::fs::create_dir_all(logs_dir)?;
    }

    let file_appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(non_blocking)
        .with_ansi(false);

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    // The writer thread must outlive the process
    std::mem::forget(guard);

    Ok(())
}
