//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! gateway.toml (optional) + CLI overrides
//!     → loader.rs (parse, override, resolve paths)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc with the dispatcher and authorization mediator
//!
//! .env.<stage> (optional)
//!     → environment.rs (or derived defaults)
//!     → StageEnvironment passed to command functions
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults so a bare service directory works
//! - Validation separates syntactic (serde) from semantic checks

pub mod environment;
pub mod loader;
pub mod schema;
pub mod validation;

pub use environment::StageEnvironment;
pub use loader::{load_service_config, ConfigError, Overrides};
pub use schema::{
    ApiConfig, AuthConfig, FunctionConfig, FunctionsConfig, GatewayConfig, ListenerConfig,
    ObservabilityConfig,
};
