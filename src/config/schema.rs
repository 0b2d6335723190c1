//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from `gateway.toml`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limits).
    pub listener: ListenerConfig,

    /// API document and service metadata.
    pub api: ApiConfig,

    /// Authorizer stage variables and `methodArn` parts.
    pub auth: AuthConfig,

    /// Handler and authorizer functions.
    pub functions: FunctionsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:4001").
    pub bind_address: String,

    /// Largest request body buffered for dispatch, in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:4001".to_string(),
            // Lambda's synchronous payload limit
            max_body_size: 6 * 1024 * 1024,
        }
    }
}

/// API document and service metadata.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// OpenAPI document (JSON). Relative paths resolve against the service directory.
    pub spec_path: PathBuf,

    /// Project the service belongs to.
    pub project: Option<String>,

    /// Service name.
    pub name: Option<String>,

    /// Main entity of the service, exported as `DB_TABLE`.
    pub main_entity: Option<String>,

    /// Deployment stage (selects `.env.<stage>`).
    pub stage: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            spec_path: PathBuf::from("swagger/oas30_templ.json"),
            project: None,
            name: None,
            main_entity: None,
            stage: "dev".to_string(),
        }
    }
}

/// Values handed to the authorizer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Token issuer, passed as the `issuer` stage variable.
    pub issuer: String,

    /// Token audience, passed as the `audience` stage variable.
    pub audience: String,

    pub region: String,

    pub account_id: String,

    pub api_id: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: String::new(),
            audience: String::new(),
            region: "il-central-1".to_string(),
            account_id: "123456789012".to_string(),
            api_id: "local".to_string(),
        }
    }
}

/// The functions requests are dispatched to.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FunctionsConfig {
    /// Business handler invoked for every operation.
    pub handler: FunctionConfig,

    /// Authorizer invoked for operations that declare security.
    pub authorizer: Option<FunctionConfig>,
}

/// How to reach a function.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FunctionConfig {
    /// A Lambda Invoke API endpoint (runtime interface emulator, `cargo lambda watch`).
    Http { url: String },

    /// A process reading the event on stdin and writing the result to stdout.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        cwd: Option<PathBuf>,
    },
}

impl Default for FunctionConfig {
    fn default() -> Self {
        FunctionConfig::Http {
            url: "http://127.0.0.1:9000/2015-03-31/functions/function/invocations".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9091".to_string(),
        }
    }
}
