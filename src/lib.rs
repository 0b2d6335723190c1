//! Local API gateway for Lambda-style functions.

pub mod config;
pub mod error;
pub mod events;
pub mod functions;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::schema::GatewayConfig;
pub use error::{GatewayError, StartupError};
pub use http::{Functions, HttpServer};
pub use lifecycle::Shutdown;
