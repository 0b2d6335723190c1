//! Handler-facing invocation events.
//!
//! # Responsibilities
//! - Define the API Gateway proxy event handed to the business handler
//! - Translate a buffered HTTP request plus its operation into that event
//!
//! # Design Decisions
//! - Every event field is listed explicitly; nothing is deep-merged
//! - Headers pass through exactly as received from the transport
//! - Query parameters are always a mapping, never null
//! - A non-empty binary payload replaces the JSON body (base64)

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::Method;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{ApiConfig, AuthConfig};
use crate::error::GatewayError;
use crate::routing::{OperationDescriptor, PathParameters};

/// A request as seen by the pipeline, after the body has been read.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub method: Method,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    /// Parsed JSON body; `{}` when the request carried none.
    pub body: Value,
    /// Raw payload of a multipart request, buffered whole.
    pub binary_body: Option<Vec<u8>>,
    pub request_id: String,
    pub source_ip: Option<String>,
}

impl GatewayRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: BTreeMap::new(),
            query: BTreeMap::new(),
            body: Value::Object(Map::new()),
            binary_body: None,
            request_id: String::new(),
            source_ip: None,
        }
    }
}

/// Identity claims an authorizer attached to the request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerContext {
    pub principal_id: String,
    #[serde(flatten)]
    pub claims: Map<String, Value>,
}

impl AuthorizerContext {
    /// Build from a policy's `principalId` and `context`; `principalId` wins
    /// over a claim with the same key.
    pub fn new(principal_id: impl Into<String>, mut claims: Map<String, Value>) -> Self {
        claims.remove("principalId");
        Self {
            principal_id: principal_id.into(),
            claims,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestIdentity {
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub account_id: String,
    pub api_id: String,
    pub stage: String,
    pub request_id: String,
    pub resource_path: String,
    pub http_method: String,
    pub path: String,
    /// Name of the resolved operation.
    pub operation_name: String,
    pub request_time_epoch: u64,
    pub identity: RequestIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorizer: Option<AuthorizerContext>,
}

/// Event passed to the business handler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvocationEvent {
    pub resource: String,
    pub path: String,
    pub http_method: String,
    pub headers: BTreeMap<String, String>,
    pub query_string_parameters: BTreeMap<String, String>,
    pub path_parameters: Option<PathParameters>,
    pub request_context: RequestContext,
    pub body: Option<String>,
    pub is_base64_encoded: bool,
}

impl InvocationEvent {
    /// Replace the body with a base64 encoded binary payload.
    pub fn set_binary_body(&mut self, payload: &[u8]) {
        self.body = Some(STANDARD.encode(payload));
        self.is_base64_encoded = true;
    }

    /// Name of the operation this event was built for.
    pub fn operation_name(&self) -> &str {
        &self.request_context.operation_name
    }
}

/// Builds handler events; holds the process-wide values every event carries.
#[derive(Debug, Clone)]
pub struct EventTranslator {
    auth: Arc<AuthConfig>,
    stage: String,
}

impl EventTranslator {
    pub fn new(auth: Arc<AuthConfig>, api: &ApiConfig) -> Self {
        Self {
            auth,
            stage: api.stage.clone(),
        }
    }

    pub fn translate(
        &self,
        request: &GatewayRequest,
        operation: &OperationDescriptor,
    ) -> Result<InvocationEvent, GatewayError> {
        let path_parameters = operation
            .template()
            .extract(&request.path)?
            .into_event_parameters();

        let method = request.method.to_string();
        let request_context = RequestContext {
            account_id: self.auth.account_id.clone(),
            api_id: self.auth.api_id.clone(),
            stage: self.stage.clone(),
            request_id: request.request_id.clone(),
            resource_path: operation.path.clone(),
            http_method: method.clone(),
            path: request.path.clone(),
            operation_name: operation.name.clone(),
            request_time_epoch: now_millis(),
            identity: RequestIdentity {
                source_ip: request.source_ip.clone(),
                user_agent: request.headers.get("user-agent").cloned(),
            },
            authorizer: None,
        };

        let mut event = InvocationEvent {
            resource: operation.path.clone(),
            path: request.path.clone(),
            http_method: method,
            headers: request.headers.clone(),
            query_string_parameters: request.query.clone(),
            path_parameters,
            request_context,
            body: Some(request.body.to_string()),
            is_base64_encoded: false,
        };

        if let Some(payload) = request.binary_body.as_deref().filter(|p| !p.is_empty()) {
            event.set_binary_body(payload);
        }

        Ok(event)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
