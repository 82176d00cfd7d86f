use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "checkpointer.log";

/// Install a file-backed tracing subscriber.
///
/// The terminal belongs to the UI, so log lines go to a daily rotated file.
/// `RUST_LOG` overrides the default `info` level.
pub fn init(log_dir: Option<&Path>) -> Result<WorkerGuard> {
  let dir = log_dir.map(Path::to_path_buf).unwrap_or_else(default_log_dir);
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let env_filter = EnvFilter::builder()
    .with_default_directive(LevelFilter::INFO.into())
    .from_env_lossy();

  tracing_subscriber::registry()
    .with(env_filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false).with_target(true))
    .try_init()
    .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;

  Ok(guard)
}

fn default_log_dir() -> PathBuf {
  dirs::data_dir()
    .or_else(dirs::cache_dir)
    .unwrap_or_else(std::env::temp_dir)
    .join("checkpointer")
    .join("logs")
}
