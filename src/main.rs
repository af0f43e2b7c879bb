//! Voice connector binary.
//!
//! Reads its configuration from the environment, connects, and stays in the
//! voice channel until interrupted.
//!
//! ```bash
//! DISCORD_TOKEN=... DISCORD_GUILD_ID=... DISCORD_CHANNEL_ID=... voice-connector [--debug]
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::process::ExitCode;

use discord_voice_connector::{Connector, ConnectorConfig, logging};
use tracing::{error, info};

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    debug: bool,
}

impl Args {
    /// Parse command-line arguments.
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self {
            debug: args.iter().any(|a| a == "--debug"),
        }
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match ConnectorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_logging(args.debug, config.log_file()) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    info!(
        guild_id = %config.target().guild_id,
        channel_id = %config.target().channel_id,
        self_mute = config.session().self_mute,
        self_deaf = config.session().self_deaf,
        "Starting voice connector"
    );

    let connector = Connector::new(config);
    connector.start();

    let exit = tokio::select! {
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => {
                info!("Interrupt received, shutting down");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for interrupt, shutting down");
                ExitCode::FAILURE
            }
        },
        () = connector.closed() => {
            error!("Connector task exited unexpectedly, shutting down");
            ExitCode::FAILURE
        }
    };

    connector.stop().await;
    info!("Voice connector stopped");
    exit
}
