//! NextGCore EMMAS-SAP replay daemon
//!
//! Loads subscriber security contexts, replays uplink NAS PDUs through the
//! EMM/AS service access point and logs the access stratum messages it
//! produces.

use anyhow::{Context, Result};
use clap::Parser;

pub mod config;
pub mod replay;

use config::EmmasdConfig;
use replay::Replay;

/// NextGCore EMMAS-SAP - EMM to access stratum replay
#[derive(Parser, Debug)]
#[command(name = "nextgcore-emmasd")]
#[command(author = "NextGCore")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "EMM/AS service access point replay")]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/nextgcore/emmas.yaml")]
    config: String,

    /// Log level (trace, debug, info, warn, error), overrides logger.level
    #[arg(short, long)]
    log_level: Option<String>,

    /// Parse and validate the configuration only
    #[arg(long)]
    dry_run: bool,
}

fn level_filter(level: &str) -> log::LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = EmmasdConfig::load(&args.config)
        .with_context(|| format!("Failed to load configuration '{}'", args.config))?;

    let level = args.log_level.as_deref().unwrap_or(&config.logger.level);
    env_logger::Builder::new()
        .filter_level(level_filter(level))
        .format_timestamp_millis()
        .init();

    log::info!("NextGCore EMMAS-SAP v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Configuration: {}", args.config);

    config.validate().context("Invalid configuration")?;
    if args.dry_run {
        log::info!(
            "Configuration OK: {} subscriber(s), {} PDU(s) to replay",
            config.emmas.subscribers.len(),
            config.emmas.replay.len()
        );
        return Ok(());
    }

    let mut replay = Replay::new(&config).context("Failed to load subscribers")?;
    let summary = replay.run(&config).context("Replay aborted")?;

    log::info!(
        "Replay done: {} primitive(s), {} failed, {} EMM status sent, {} AS message(s)",
        summary.replayed,
        summary.failed,
        summary.status_sent,
        replay.transport.sent.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter() {
        assert_eq!(level_filter("TRACE"), log::LevelFilter::Trace);
        assert_eq!(level_filter("warn"), log::LevelFilter::Warn);
        assert_eq!(level_filter("verbose"), log::LevelFilter::Info);
    }

    #[test]
    fn test_args() {
        let args = Args::parse_from(["nextgcore-emmasd", "-c", "emmas.yaml", "--dry-run"]);
        assert_eq!(args.config, "emmas.yaml");
        assert!(args.dry_run);
        assert!(args.log_level.is_none());

        let args = Args::parse_from(["nextgcore-emmasd", "-l", "debug"]);
        assert_eq!(args.config, "/etc/nextgcore/emmas.yaml");
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }
}
