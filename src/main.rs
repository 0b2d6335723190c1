//! Local API gateway for Lambda functions.
//!
//! Serves an OpenAPI-described API on a local port and turns every request
//! into a Lambda proxy event for a locally running function.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ routing::router ──▶ http::request
//!                                                              │
//!                                                              ▼
//!                      security::authorizer ◀──────────── events::request
//!                              │ (secured operations only)
//!                              ▼
//!                      functions (http | command) ──▶ events::response
//!                                                              │
//!     Client Response                                          ▼
//!     ◀────────────────────────────────────────────── http::response
//!
//!     Cross-cutting: config, observability, lifecycle
//! ```

use std::path::PathBuf;

use clap::Parser;

use lambda_gateway::config::Overrides;
use lambda_gateway::lifecycle::signals;
use lambda_gateway::lifecycle::startup::{self, StartupOptions};
use lambda_gateway::observability::{logging, metrics};
use lambda_gateway::Shutdown;

#[derive(Parser)]
#[command(name = "lambda-gateway")]
#[command(about = "Serve an OpenAPI document locally and invoke Lambda functions for it", long_about = None)]
struct Cli {
    /// Service directory holding the API document and stage files
    #[arg(default_value = ".")]
    service_dir: PathBuf,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Stage name, selects `.env.<stage>`
    #[arg(short, long)]
    stage: Option<String>,

    /// Configuration file (defaults to `gateway.toml` in the service directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// OpenAPI document, relative to the service directory
    #[arg(long)]
    spec: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let options = StartupOptions {
        service_dir: cli.service_dir,
        config_path: cli.config,
        overrides: Overrides {
            port: cli.port,
            stage: cli.stage,
            spec_path: cli.spec,
        },
    };

    let config = startup::load_config(&options)?;
    logging::init(&config.observability);
    tracing::info!("lambda-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    let gateway = startup::prepare(&options, config)?;
    let listener = startup::bind(gateway.server.config()).await?;

    let observability = &gateway.server.config().observability;
    if observability.metrics_enabled {
        match observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    startup::announce(&gateway, &listener);

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    tokio::spawn(async move {
        signals::shutdown_on_signal(&shutdown).await;
    });

    gateway.server.run(listener, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
