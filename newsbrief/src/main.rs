/*
newsbrief - main.rs
Loads configuration, then runs the digest job on its schedule until interrupted.
*/

use anyhow::{Context, Result};
use clap::Parser;
use common::Config;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use newsbrief::app::App;

#[derive(Parser, Debug)]
#[command(name = "newsbrief", about = "Scheduled news page digest sent by email")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Run the job once before entering the schedule loop (also RUN_NOW=true)
    #[arg(long)]
    run_now: bool,

    /// Run the job a single time and exit
    #[arg(long, conflicts_with = "run_now")]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI args
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Resolve config paths
    let default_path = PathBuf::from("config.default.toml");
    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let config = Config::load_with_defaults(Some(&default_path), override_path.as_deref())
        .await
        .context("failed to load configuration")?;

    // Initialize logging
    init_logging(&args.log_level, config.logging.file.as_deref())?;
    info!(default = ?default_path, override = ?override_path, "configuration loaded");

    let app = match App::from_config(&config, |key| std::env::var(key).ok()) {
        Ok(app) => app,
        Err(e) => {
            error!("Startup failed: {:#}", e);
            return Err(e);
        }
    };

    if args.once {
        let outcome = app.run_once().await;
        info!(?outcome, "single run finished");
        return Ok(());
    }

    let run_now = args.run_now || common::run_now_from_env();
    app.run(run_now, shutdown_signal()).await;

    info!("Shutdown complete");
    Ok(())
}

fn init_logging(level: &str, file: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    match file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file: {}", path))?;
            fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => fmt().with_env_filter(filter).init(),
    }
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("ctrl-c received, stopping scheduler"),
        Err(e) => {
            error!(%e, "failed to listen for ctrl-c; running until killed");
            std::future::pending::<()>().await;
        }
    }
}
