//! lockerd - locker board control
//!
//! Serves the locker protocol over TCP, or runs a single command against the
//! board and exits.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use locker_core::{Bay, LockerConfig};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

/// Configuration file picked up from the working directory when `--config`
/// is not given.
const DEFAULT_CONFIG_FILE: &str = "lockerd.toml";

/// lockerd - locker board control
#[derive(Parser, Debug)]
#[command(name = "lockerd")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port of the locker board (overrides config)
    #[arg(short, long)]
    port: Option<String>,

    /// Address to listen on when serving (overrides config)
    #[arg(long)]
    bind: Option<std::net::SocketAddr>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Write logs to this file instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Use an in-process simulated board instead of the serial port
    #[arg(long)]
    simulate: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve lock requests over TCP
    Serve,

    /// Open one bay
    Open {
        /// Bay number (1-8)
        bay: Bay,

        /// Wait until the door is shut again
        #[arg(long)]
        wait: bool,

        /// Milliseconds between status checks while waiting
        #[arg(long, default_value_t = locker_core::constants::DEFAULT_POLL_INTERVAL_MS)]
        interval_ms: u64,

        /// Give up waiting after this many seconds
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,
    },

    /// Show the lock state of one bay
    Status {
        /// Bay number (1-8)
        bay: Bay,
    },

    /// Show the lock state of every bay
    #[command(name = "status-all")]
    StatusAll,

    /// List serial ports on this machine
    Ports,

    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    init_logging(&config)?;

    let runtime = tokio::runtime::Runtime::new().context("failed to build tokio runtime")?;
    runtime.block_on(run(cli, config))
}

async fn run(cli: Cli, config: LockerConfig) -> Result<()> {
    match cli.command {
        Commands::Serve => commands::serve(&config, cli.simulate).await,
        Commands::Open {
            bay,
            wait,
            interval_ms,
            timeout_secs,
        } => {
            let wait = wait.then(|| locker_controller::PollOptions {
                interval: Duration::from_millis(interval_ms),
                timeout: Duration::from_secs(timeout_secs),
            });
            commands::open(&config, cli.simulate, bay, wait).await
        }
        Commands::Status { bay } => commands::status(&config, cli.simulate, bay).await,
        Commands::StatusAll => commands::status_all(&config, cli.simulate).await,
        Commands::Ports => {
            commands::ports();
            Ok(())
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

/// Load the configuration file and apply command line overrides.
fn load_config(cli: &Cli) -> Result<LockerConfig> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            read_config(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => LockerConfig::default(),
    };

    if let Some(port) = &cli.port {
        config.serial.port.clone_from(port);
    }
    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level.clone_from(level);
    }
    if let Some(file) = &cli.log_file {
        config.logging.file = Some(file.clone());
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<LockerConfig> {
    LockerConfig::from_file(path)
        .with_context(|| format!("failed to load config from {}", path.display()))
}

fn init_logging(config: &LockerConfig) -> Result<()> {
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(log_file) = &config.logging.file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .with_context(|| format!("failed to open log file {}", log_file.display()))?;

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides_applied() {
        let cli = Cli::parse_from([
            "lockerd",
            "--port",
            "/dev/ttyACM1",
            "--bind",
            "0.0.0.0:6000",
            "--log-level",
            "debug",
            "status",
            "3",
        ]);

        let config = load_config(&cli).unwrap();

        assert_eq!(config.serial.port, "/dev/ttyACM1");
        assert_eq!(config.server.bind_addr.port(), 6000);
        assert_eq!(config.logging.level, "debug");
        assert!(matches!(cli.command, Commands::Status { bay } if bay.as_u8() == 3));
    }

    #[test]
    fn test_open_wait_defaults() {
        let cli = Cli::parse_from(["lockerd", "--simulate", "open", "5", "--wait"]);

        assert!(cli.simulate);
        match cli.command {
            Commands::Open {
                bay,
                wait,
                interval_ms,
                timeout_secs,
            } => {
                assert_eq!(bay.as_u8(), 5);
                assert!(wait);
                assert_eq!(interval_ms, 2000);
                assert_eq!(timeout_secs, 60);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[rstest]
    #[case("0")]
    #[case("9")]
    #[case("front")]
    fn test_invalid_bay_rejected(#[case] bay: &str) {
        assert!(Cli::try_parse_from(["lockerd", "open", bay]).is_err());
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let cli = Cli::parse_from(["lockerd", "--config", "/nonexistent/lockerd.toml", "ports"]);
        assert!(load_config(&cli).is_err());
    }
}
