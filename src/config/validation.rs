//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and function endpoints
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{FunctionConfig, GatewayConfig};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("listener.max_body_size must be greater than zero")]
    MaxBodySize,

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),

    #[error("functions.{role}.url {url:?} is not an http(s) URL")]
    FunctionUrl { role: &'static str, url: String },

    #[error("functions.{0}.program is empty")]
    EmptyProgram(&'static str),
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_body_size == 0 {
        errors.push(ValidationError::MaxBodySize);
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    validate_function("handler", &config.functions.handler, &mut errors);
    if let Some(authorizer) = &config.functions.authorizer {
        validate_function("authorizer", authorizer, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_function(role: &'static str, function: &FunctionConfig, errors: &mut Vec<ValidationError>) {
    match function {
        FunctionConfig::Http { url } => {
            let valid = url::Url::parse(url)
                .map(|u| matches!(u.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !valid {
                errors.push(ValidationError::FunctionUrl { role, url: url.clone() });
            }
        }
        FunctionConfig::Command { program, .. } => {
            if program.trim().is_empty() {
                errors.push(ValidationError::EmptyProgram(role));
            }
        }
    }
}
