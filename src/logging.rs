use crate::models::error::SError;
use camino::Utf8Path;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_PREFIX: &str = "mod_mount.log";

/// Daily rolling log files in `log_dir`. `RUST_LOG` overrides the default level.
///
/// The returned guard flushes pending lines on drop; keep it alive for the
/// whole session.
pub fn setup_logging(log_dir: &Utf8Path, debug_mode: bool) -> Result<WorkerGuard, SError> {
    setup_logging_with_console(log_dir, debug_mode, false)
}

/// Same as [`setup_logging`], optionally mirroring everything to stderr.
pub fn setup_logging_with_console(
    log_dir: &Utf8Path,
    debug_mode: bool,
    console_output: bool,
) -> Result<WorkerGuard, SError> {
    fs::create_dir_all(log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(rolling::daily(log_dir, LOG_PREFIX));

    let default_level = if debug_mode { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_line_number(true);

    let console_layer = console_output.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| SError::Config(format!("logging already initialised: {e}")))?;

    tracing::info!(%log_dir, debug = debug_mode, console = console_output, "logging initialized");
    Ok(guard)
}
