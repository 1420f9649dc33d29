//! elastic-upstream
//!
//! Receives scaling-group lifecycle notifications and keeps one nginx
//! `upstream` block per group in sync with the group's live members.
//!
//! # Architecture Overview
//!
//! ```text
//!     Notification (HTTP POST)
//!     ─────────────────────────▶ http server ──▶ event dispatcher
//!                                                     │
//!                                  envelope → message → group → resolve
//!                                                     │
//!                                                     ▼
//!                                         reconfiguration engine
//!                                    ┌─────────── group lock ───────────┐
//!                                    │ record store → artifact → reload │
//!                                    └──────────────────────────────────┘
//!
//!     Cross-cutting: config, observability (tracing + Prometheus), lifecycle
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;

use elastic_upstream::config::{load_config, DEFAULT_CONFIG_PATH};
use elastic_upstream::lifecycle::{bootstrap, signals, startup, Shutdown};
use elastic_upstream::observability::{logging, metrics};
use elastic_upstream::HttpServer;

#[derive(Parser)]
#[command(name = "elastic-upstream", version)]
#[command(about = "Sync nginx upstream blocks with auto-scaling group membership", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the listener bind address
    #[arg(short, long)]
    listen: Option<String>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {e}", cli.config.display());
            return ExitCode::from(2);
        }
    };

    if cli.check {
        println!(
            "{}: OK ({} group(s))",
            cli.config.display(),
            config.groups.len()
        );
        return ExitCode::SUCCESS;
    }

    if let Some(listen) = cli.listen {
        config.listener.bind_address = listen;
    }

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), config = %cli.config.display(), "elastic-upstream starting");

    match run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: elastic_upstream::Config) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let services = bootstrap(&config)?;
    if config.regenerate_on_start {
        startup::resync_on_start(&services.engine).await;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for notifications");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_handler(shutdown);

    HttpServer::new(&config, services.dispatcher).run(listener, server_shutdown).await?;
    Ok(())
}
