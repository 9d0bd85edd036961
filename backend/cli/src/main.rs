use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use logging::init_logger;
use ringline_config::{validate, Config};
use ringline_core::RingError;
use ringline_gateway::{start_server, AppState};
use ringline_ivr::{IvrEngine, IvrSettings};
use ringline_storage::{CallStore, SqliteCallStore};

#[derive(Parser)]
#[command(name = "ringline")]
#[command(about = "Ringline — IVR call logging and routing server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server
    Serve {
        /// Port to bind the HTTP server to (overrides RINGLINE_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    init_logger(&config.log_dir, &config.log_level);

    let cli = Cli::parse();

    let report = validate(&config);
    for warning in &report.warnings {
        warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    if !report.is_valid() {
        for err in &report.errors {
            error!(path = %err.path, message = %err.message, "Config error");
        }
        return Err(RingError::ConfigError(format!(
            "{} validation error(s), see log output",
            report.errors.len()
        ))
        .into());
    }

    match cli.command {
        Commands::Check => {
            info!("Configuration OK");
            Ok(())
        }
        Commands::Serve { port } => {
            let store: Arc<dyn CallStore> =
                Arc::new(SqliteCallStore::open(&config.db_path).with_context(|| {
                    format!("failed to open call database at {}", config.db_path)
                })?);

            let settings = IvrSettings {
                forward_to_number: config.forward_to_number.clone(),
                caller_id_number: config.caller_id_number.clone(),
                recording_url_prefix: config.recording_url_prefix.clone(),
                ..IvrSettings::default()
            };
            let engine = Arc::new(IvrEngine::new(store.clone(), settings));
            let state = Arc::new(AppState { engine, store });

            let port = port.unwrap_or(config.port);
            let addr: SocketAddr = format!("{}:{}", config.bind_address, port)
                .parse()
                .context("invalid bind address")?;

            info!("Point the carrier voice webhook at POST <public-url>/twilio/voice");
            start_server(addr, state).await
        }
    }
}
