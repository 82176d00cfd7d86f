mod app;
mod commands;
mod event;
mod logging;
mod ui;

use checkpointer::config::Config;
use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "checkpointer")]
#[command(about = "A terminal client for the Checkpointer game tracker")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/checkpointer/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// API base URL, overrides api.url from the config file
  #[arg(short, long)]
  url: Option<String>,

  /// Directory for log files (default: $XDG_DATA_HOME/checkpointer/logs)
  #[arg(long)]
  log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // The guard flushes buffered log lines on drop, so it lives until exit
  let _log_guard = logging::init(args.log_dir.as_deref())?;

  let mut config = Config::load(args.config.as_deref())?;
  if let Some(url) = args.url {
    config.api.url = url;
  }

  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}
