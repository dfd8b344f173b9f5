//! Replication daemon - delivers replication messages to peer instances.

mod app;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use replication_config_and_utils::{init_logging, Config, Paths};

/// Replication daemon command-line interface.
#[derive(Parser)]
#[command(name = "replication-daemon")]
#[command(about = "Reliable replication of messages between instances")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config, database and PID file. Defaults to ~/.replication
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon in the foreground
    Start,
    /// Show the daemon and message store status
    Status,
    /// Ask peers to replay what they sent in a time window
    Recover {
        /// Start of the window (RFC 3339)
        #[arg(long)]
        from: String,
        /// End of the window (RFC 3339)
        #[arg(long)]
        to: String,
        /// Only ask these peer URIs (all peers when omitted)
        #[arg(long)]
        peer: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let config = Config::load(&paths)?;

    // Initialize logging
    init_logging(cli.log_level.as_deref().unwrap_or(&config.log_level));

    match cli.command {
        Some(Commands::Start) | None => {
            app::run_daemon(config, paths).await?;
        }
        Some(Commands::Status) => {
            app::check_status(&paths)?;
        }
        Some(Commands::Recover { from, to, peer }) => {
            let window = app::parse_window(&from, &to)?;
            app::request_recovery(config, paths, window, peer).await?;
        }
    }

    Ok(())
}
