//! Error taxonomy for the request pipeline.
//!
//! Every failure that can happen after a request reaches the gateway is a
//! [`GatewayError`]. The HTTP mapping lives here so that no handler ever writes
//! internal detail to the client: the full error goes to the log, the client
//! gets a fixed payload.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::config::ConfigError;
use crate::functions::FunctionError;
use crate::routing::SpecError;

/// Errors raised while serving a single request.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No declared operation has a matching path.
    #[error("no operation matches {method} {path}")]
    RouteNotFound { method: String, path: String },

    /// The path matches a declared operation but the method does not.
    #[error("method {method} not allowed for {path}")]
    MethodNotAllowed { method: String, path: String },

    /// Template and request path disagree on segment count.
    #[error("path {path:?} does not fit template {template:?}")]
    MalformedPath { template: String, path: String },

    /// The request body could not be read from the connection.
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    /// The request body is larger than the configured limit.
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// A JSON content type was declared but the body is not JSON.
    #[error("invalid JSON request body: {0}")]
    InvalidBody(#[source] serde_json::Error),

    /// The authorizer returned anything other than an `Allow` effect.
    #[error("authorizer denied {operation}")]
    AuthorizationDenied { operation: String },

    /// A secured operation was reached with no authorizer configured.
    #[error("no authorizer configured for {operation}")]
    AuthorizerUnavailable { operation: String },

    /// The authorizer or the handler failed.
    #[error("upstream invocation failed: {0}")]
    Invocation(#[from] FunctionError),

    /// The handler result cannot be expressed as an HTTP response.
    #[error("invalid handler response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// HTTP status this error is surfaced as.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::BodyRead(_) | GatewayError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::AuthorizationDenied { .. } => StatusCode::UNAUTHORIZED,
            GatewayError::MalformedPath { .. }
            | GatewayError::AuthorizerUnavailable { .. }
            | GatewayError::Invocation(_)
            | GatewayError::InvalidResponse(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            GatewayError::RouteNotFound { .. } => json!({ "error": "Not found" }),
            GatewayError::MethodNotAllowed { .. } => json!({ "error": "Method not allowed" }),
            GatewayError::BodyRead(_) => json!({ "error": "Unable to read request body" }),
            GatewayError::PayloadTooLarge { .. } => json!({ "error": "Payload too large" }),
            GatewayError::InvalidBody(_) => json!({ "error": "Invalid JSON body" }),
            GatewayError::AuthorizationDenied { .. } => json!({ "message": "Unauthorized" }),
            _ => json!({ "error": "Internal server error" }),
        };
        (status, Json(body)).into_response()
    }
}

/// Errors that stop the gateway from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error(transparent)]
    Function(#[from] FunctionError),

    /// Operations declare security but no authorizer function is configured.
    #[error("operations {0:?} require authorization but no authorizer is configured")]
    MissingAuthorizer(Vec<String>),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: GatewayError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_denial_is_generic_401() {
        let (status, body) = body_of(GatewayError::AuthorizationDenied {
            operation: "Widgets.get".into(),
        })
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "message": "Unauthorized" }));
    }

    #[tokio::test]
    async fn test_internal_errors_hide_detail() {
        let (status, body) = body_of(GatewayError::MalformedPath {
            template: "/widgets/{id}".into(),
            path: "/widgets".into(),
        })
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Internal server error" }));

        let (status, body) = body_of(GatewayError::InvalidResponse("status 1000".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.to_string().contains("1000"));
    }

    #[tokio::test]
    async fn test_routing_errors() {
        let (status, _) = body_of(GatewayError::RouteNotFound {
            method: "GET".into(),
            path: "/nope".into(),
        })
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = body_of(GatewayError::MethodNotAllowed {
            method: "PATCH".into(),
            path: "/widgets".into(),
        })
        .await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_body_errors() {
        let (status, body) = body_of(GatewayError::PayloadTooLarge { limit: 16 }).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body, json!({ "error": "Payload too large" }));

        let (status, _) = body_of(GatewayError::BodyRead("connection reset".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
