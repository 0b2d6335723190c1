//! Startup orchestration.
//!
//! # Order
//! 1. Load and validate configuration (before logging, which it configures)
//! 2. Load the stage environment
//! 3. Read and index the API document
//! 4. Build handler and authorizer functions
//! 5. Bind the listener last, so traffic only arrives when everything is ready
//!
//! Any failure is fatal.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::net::TcpListener;

use crate::config::{load_service_config, GatewayConfig, Overrides, StageEnvironment};
use crate::config::environment::EnvironmentSource;
use crate::error::StartupError;
use crate::functions::build_function;
use crate::http::{Functions, HttpServer};
use crate::routing::SpecError;

/// Where the service lives and what the command line overrides.
#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    pub service_dir: PathBuf,
    pub config_path: Option<PathBuf>,
    pub overrides: Overrides,
}

/// A gateway ready to bind.
pub struct Gateway {
    pub environment: StageEnvironment,
    pub server: HttpServer,
}

pub fn load_config(options: &StartupOptions) -> Result<GatewayConfig, StartupError> {
    Ok(load_service_config(
        &options.service_dir,
        options.config_path.as_deref(),
        &options.overrides,
    )?)
}

/// Read an OpenAPI document from disk.
pub fn load_document(path: &Path) -> Result<Value, SpecError> {
    let content = fs::read_to_string(path).map_err(|source| SpecError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| SpecError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Build everything except the listener.
pub fn prepare(options: &StartupOptions, config: GatewayConfig) -> Result<Gateway, StartupError> {
    let environment = StageEnvironment::load(&options.service_dir, &config)?;
    match environment.source() {
        EnvironmentSource::File(path) => {
            tracing::info!(path = %path.display(), stage = %config.api.stage, "Stage environment loaded")
        }
        EnvironmentSource::Derived => {
            tracing::info!(stage = %config.api.stage, "No stage environment file, using derived defaults")
        }
    }

    let document = load_document(&config.api.spec_path)?;

    let functions = Functions {
        handler: build_function(&config.functions.handler, &environment)?,
        authorizer: config
            .functions
            .authorizer
            .as_ref()
            .map(|f| build_function(f, &environment))
            .transpose()?,
    };

    let server = HttpServer::new(config, document, functions)?;
    Ok(Gateway { environment, server })
}

/// Bind the configured listener address.
pub async fn bind(config: &GatewayConfig) -> Result<TcpListener, StartupError> {
    let address = config.listener.bind_address.clone();
    TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })
}

/// Log what is being served.
pub fn announce(gateway: &Gateway, listener: &TcpListener) {
    let config = gateway.server.config();
    let service = match (&config.api.project, &config.api.name) {
        (Some(project), Some(name)) => format!("{project} | {name}"),
        (Some(single), None) | (None, Some(single)) => single.clone(),
        (None, None) => "service".to_string(),
    };

    tracing::info!(service = %service, spec = %config.api.spec_path.display(), "Local API gateway for Lambda");
    for (key, value) in gateway.environment.vars() {
        tracing::info!(stage = %config.api.stage, "{key}: {value}");
    }
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Listening on http://localhost:{}", addr.port());
        tracing::info!("API document on http://localhost:{}/openapi.json", addr.port());
    }
}
