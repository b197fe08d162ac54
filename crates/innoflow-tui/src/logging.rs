use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_LEVEL_ENV: &str = "INNOFLOW_LOG_LEVEL";

/// The terminal belongs to the UI, so everything goes to a file. Keep the
/// returned guard alive until exit or buffered lines are lost.
pub fn init_logging() -> Result<(PathBuf, WorkerGuard)> {
    let log_dir = log_directory()?;
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;

    let log_file_path = log_file_path(&log_dir);
    let file = fs::File::create(&log_file_path)
        .with_context(|| format!("failed to create {}", log_file_path.display()))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(build_log_filter(std::env::var(LOG_LEVEL_ENV).ok().as_deref()))
        .with(file_layer)
        .init();

    tracing::info!(path = %log_file_path.display(), "logging initialized");
    Ok((log_file_path, guard))
}

fn build_log_filter(raw: Option<&str>) -> EnvFilter {
    let level = raw.and_then(normalize_log_level).unwrap_or("warn");
    EnvFilter::new(format!(
        "{level},innoflow={level},innoflow_tui={level},innoflow_service={level}"
    ))
}

fn normalize_log_level(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}

pub fn log_directory() -> Result<PathBuf> {
    let data_dir =
        dirs::data_local_dir().context("failed to determine local data directory")?;
    Ok(data_dir.join("innoflow").join("logs"))
}

pub fn log_file_path(log_dir: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    log_dir.join(format!("innoflow-{timestamp}.log"))
}
