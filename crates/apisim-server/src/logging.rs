//! Logging initialization and configuration.
//!
//! This module provides environment-aware logging setup:
//! - **Production**: JSON logs to rolling files + compact logs to stdout
//! - **Development**: Pretty logs to stdout with span events

use std::sync::OnceLock;

use apisim_core::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Static guards to keep non-blocking writers alive.
/// These must persist for the lifetime of the program.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static STDOUT_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Prefix of the rolling log files.
const LOG_FILE_PREFIX: &str = "apisim";

/// Initialize the logging system from the `[logging]` configuration.
///
/// `RUST_LOG` takes precedence over the configured level.
///
/// # Production Mode
///
/// - Logs to rolling daily files in the configured log directory
/// - Also logs to stdout for container and journal capture
/// - JSON format for structured logging in files
/// - Compact format for stdout (no ANSI colors)
///
/// # Development Mode
///
/// - Logs to stdout only with pretty formatting
/// - Includes span events for debugging
///
/// # Errors
///
/// Returns an error if the filter cannot be parsed or the log directory
/// cannot be created.
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = build_filter(&config.level)?;

    if config.production {
        init_production(config, env_filter)?;
    } else {
        init_development(env_filter);
    }

    Ok(())
}

/// `RUST_LOG` first, then the configured directive.
fn build_filter(level: &str) -> anyhow::Result<EnvFilter> {
    Ok(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?)
}

/// Initialize production logging with file + stdout output.
fn init_production(config: &LoggingConfig, env_filter: EnvFilter) -> anyhow::Result<()> {
    let log_dir = config.log_directory();
    std::fs::create_dir_all(&log_dir)?;

    // One file per day, named apisim.YYYY-MM-DD
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);

    // Both writers flush on a background thread while their guard lives
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);
    let (non_blocking_stdout, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    // Files get JSON with source locations for log shippers

    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking_file)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    // Stdout stays plain text so container logs carry no escape codes
    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(non_blocking_stdout)
        .with_target(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    // Dropping a guard stops its writer, so park both for the process lifetime
    let _ = FILE_GUARD.set(file_guard);
    let _ = STDOUT_GUARD.set(stdout_guard);

    Ok(())
}

/// Initialize development logging with pretty stdout output.
fn init_development(env_filter: EnvFilter) {
    let stdout_layer = tracing_subscriber::fmt::layer()
        .pretty()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .init();
}
