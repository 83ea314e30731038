//! veil daemon: periodic maintenance of a trust store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use veil_crypto::OsEntropy;
use veil_identity::{EngineConfig, FsPhotoStore, IdentityCoordinator, SweepReport};
use veil_store_lmdb::LmdbEnvironment;
use veil_utils::{format_duration_millis, init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "veil-daemon", about = "Maintenance daemon for the veil trust store")]
struct Cli {
    /// Data directory holding the store and downloaded photos.
    /// Defaults to the config file value.
    #[arg(long, env = "VEIL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "VEIL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Emit logs as newline-delimited JSON.
    #[arg(long, env = "VEIL_LOG_JSON")]
    log_json: bool,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "VEIL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run one maintenance sweep and exit.
    Sweep,
    /// Sweep repeatedly until interrupted.
    Run {
        /// Seconds between two sweeps.
        #[arg(long, default_value_t = 3600, env = "VEIL_SWEEP_INTERVAL_SECS")]
        interval_secs: u64,
    },
    /// Check the store for unreadable rows and exit.
    Check,
}

fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_toml_file(&path.to_string_lossy())?,
        None => EngineConfig::default(),
    };
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if cli.log_json {
        config.log_format = LogFormat::Json;
    }
    Ok(config)
}

fn open_engine(config: EngineConfig) -> anyhow::Result<IdentityCoordinator<LmdbEnvironment>> {
    let env = LmdbEnvironment::open(&config.data_dir.join("db"), config.map_size)?;
    let report = env.check_integrity()?;
    if !report.is_healthy() {
        tracing::warn!(errors = report.errors.len(), "store integrity check found problems");
    }
    let photos = FsPhotoStore::open(&config.data_dir.join("photos"), Arc::new(OsEntropy))?;
    Ok(IdentityCoordinator::new(env, config, Arc::new(photos)))
}

fn log_report(report: &SweepReport) {
    for due in &report.server_user_data_due {
        tracing::info!(owned = %due.owned, label = %due.label, "server user data due for refresh");
    }
    if report.expired_contact_devices > 0 {
        tracing::info!(
            count = report.expired_contact_devices,
            "contact devices with an expired pre-key"
        );
    }
}

async fn run(engine: IdentityCoordinator<LmdbEnvironment>, interval_secs: u64) -> anyhow::Result<()> {
    let engine = Arc::new(engine);
    let period = Duration::from_secs(interval_secs.max(1));
    tracing::info!(
        every = %format_duration_millis(period.as_millis() as u64),
        "sweeping until interrupted"
    );

    let mut interval = tokio::time::interval(period);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let engine = Arc::clone(&engine);
                match tokio::task::spawn_blocking(move || engine.sweep()).await? {
                    Ok(report) => log_report(&report),
                    Err(e) => tracing::error!("sweep failed: {e}"),
                }
            }
            result = &mut shutdown => {
                result?;
                tracing::info!("received SIGINT, shutting down");
                break;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level);
    tracing::info!(data_dir = %config.data_dir.display(), "opening trust store");

    match cli.command {
        Command::Sweep => {
            let engine = open_engine(config)?;
            log_report(&engine.sweep()?);
        }
        Command::Run { interval_secs } => {
            let engine = open_engine(config)?;
            run(engine, interval_secs).await?;
        }
        Command::Check => {
            let env = LmdbEnvironment::open(&config.data_dir.join("db"), config.map_size)?;
            let report = env.check_integrity()?;
            tracing::info!(
                databases = report.databases_checked,
                entries = report.total_entries,
                errors = report.errors.len(),
                "integrity check finished"
            );
            for error in &report.errors {
                tracing::error!("{error}");
            }
            if !report.is_healthy() {
                anyhow::bail!("store integrity check failed");
            }
        }
    }
    Ok(())
}
