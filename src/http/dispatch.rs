//! Per-request dispatch.
//!
//! # Flow
//! ```text
//! Request
//!     → resolve operation (404 / 405 before any body is read)
//!     → read body (multipart buffered whole, JSON parsed)
//!     → EventTranslator → InvocationEvent
//!     → AuthorizationMediator (secured operations only; 401 on denial)
//!     → Handler
//!     → HandlerResult → HTTP response
//! ```
//!
//! Every failure after routing is logged in full and answered with a fixed
//! payload. Nothing is retried.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    http::{Method, Request},
    response::{IntoResponse, Response},
};

use crate::config::{AuthConfig, GatewayConfig};
use crate::error::{GatewayError, StartupError};
use crate::events::{CallerIdentity, EventTranslator, GatewayRequest};
use crate::functions::{Authorizer, Handler};
use crate::http::request::{read_request, request_id};
use crate::http::response::into_http_response;
use crate::observability::metrics;
use crate::routing::{OperationDescriptor, OperationIndex, OperationRouter};
use crate::security::{AuthorizationMediator, Decision};

/// Runs the gateway pipeline for each request. Holds only read-only state.
pub struct Dispatcher {
    index: Arc<OperationIndex>,
    router: OperationRouter,
    translator: EventTranslator,
    mediator: Option<AuthorizationMediator>,
    handler: Handler,
    auth: Arc<AuthConfig>,
    stage: String,
    max_body_size: usize,
}

impl Dispatcher {
    /// Wire the pipeline. Fails when a secured operation has no authorizer.
    pub fn new(
        config: &GatewayConfig,
        index: Arc<OperationIndex>,
        handler: Handler,
        authorizer: Option<Authorizer>,
    ) -> Result<Self, StartupError> {
        let secured = index.secured();
        if !secured.is_empty() && authorizer.is_none() {
            return Err(StartupError::MissingAuthorizer(secured));
        }

        let auth = Arc::new(config.auth.clone());
        Ok(Self {
            router: OperationRouter::new(&index),
            translator: EventTranslator::new(auth.clone(), &config.api),
            mediator: authorizer.map(|a| AuthorizationMediator::new(a, auth.clone())),
            handler,
            auth,
            stage: config.api.stage.clone(),
            max_body_size: config.listener.max_body_size,
            index,
        })
    }

    pub fn index(&self) -> &OperationIndex {
        &self.index
    }

    /// Resolve the declared operation for a request.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<&OperationDescriptor, GatewayError> {
        let name = self.router.resolve(method, path)?;
        self.index.get(name).ok_or_else(|| GatewayError::RouteNotFound {
            method: method.to_string(),
            path: path.to_string(),
        })
    }

    /// Serve one HTTP request. Never fails: errors become responses.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let (parts, body) = request.into_parts();
        let method = parts.method.to_string();
        let path = parts.uri.path().to_string();
        let request_id = request_id(&parts.headers);

        let operation = match self.resolve(&parts.method, &path) {
            Ok(op) => op,
            Err(e) => {
                tracing::debug!(request_id = %request_id, method = %method, path = %path, error = %e, "Route not resolved");
                metrics::record_request(&method, e.status().as_u16(), "none", start);
                return e.into_response();
            }
        };

        tracing::debug!(
            request_id = %request_id,
            operation = %operation.name,
            class = operation.class_name().unwrap_or_default(),
            method = %method,
            path = %path,
            "Dispatching request"
        );

        let result = match read_request(&parts, body, self.max_body_size).await {
            Ok(request) => self.dispatch(operation, request).await,
            Err(e) => Err(e),
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                let status = e.status();
                if status.is_server_error() {
                    tracing::error!(request_id = %request_id, operation = %operation.name, error = %e, "Request failed");
                } else {
                    tracing::warn!(request_id = %request_id, operation = %operation.name, error = %e, "Request rejected");
                }
                e.into_response()
            }
        };

        let status = response.status().as_u16();
        metrics::record_request(&method, status, &operation.name, start);
        tracing::info!(
            request_id = %request_id,
            operation = %operation.name,
            method = %method,
            path = %path,
            status,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );
        response
    }

    /// Run a buffered request through the pipeline for a resolved operation.
    pub async fn dispatch(
        &self,
        operation: &OperationDescriptor,
        request: GatewayRequest,
    ) -> Result<Response, GatewayError> {
        let mut event = self.translator.translate(&request, operation)?;

        if operation.requires_auth {
            let mediator = self.mediator.as_ref().ok_or_else(|| GatewayError::AuthorizerUnavailable {
                operation: operation.name.clone(),
            })?;
            let caller =
                CallerIdentity::for_request(&self.auth, &self.stage, &event.http_method, &event.path);

            if mediator.authorize(&mut event, &caller).await? == Decision::Denied {
                return Err(GatewayError::AuthorizationDenied {
                    operation: operation.name.clone(),
                });
            }
        }

        tracing::debug!(
            handler = %self.handler.name(),
            operation = %operation.name,
            base64 = event.is_base64_encoded,
            "Invoking handler"
        );
        let result = self.handler.invoke(&event).await?;
        into_http_response(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::LocalFunction;
    use crate::routing::OperationDescriptor;
    use axum::body::to_bytes;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn index() -> Arc<OperationIndex> {
        Arc::new(
            OperationIndex::new(vec![
                OperationDescriptor::new("Widgets.get", "/widgets/{id}", Method::GET, false),
                OperationDescriptor::new("Widgets.delete", "/widgets/{id}", Method::DELETE, true),
            ])
            .unwrap(),
        )
    }

    fn echo_handler(calls: Arc<AtomicUsize>) -> Handler {
        Handler::new(Arc::new(LocalFunction::new("echo", move |event: Value| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!({ "statusCode": 200, "body": json!({ "event": event }).to_string() }))
            }
        })))
    }

    fn authorizer(effect: &'static str) -> Authorizer {
        Authorizer::new(Arc::new(LocalFunction::new("auth", move |_| async move {
            Ok(json!({
                "principalId": "user-1",
                "policyDocument": { "Statement": [{ "Effect": effect }] },
                "context": { "role": "admin" }
            }))
        })))
    }

    fn replying_authorizer(reply: Value) -> Authorizer {
        Authorizer::new(Arc::new(LocalFunction::new("auth", move |_| {
            let reply = reply.clone();
            async move { Ok(reply) }
        })))
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_secured_operations_need_authorizer() {
        let calls = Arc::new(AtomicUsize::new(0));
        let result = Dispatcher::new(&GatewayConfig::default(), index(), echo_handler(calls), None);
        assert!(matches!(
            result,
            Err(StartupError::MissingAuthorizer(ops)) if ops == vec!["Widgets.delete".to_string()]
        ));
    }

    #[tokio::test]
    async fn test_unsecured_operation_skips_authorizer() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::new(
            &GatewayConfig::default(),
            index(),
            echo_handler(calls.clone()),
            Some(authorizer("Deny")),
        )
        .unwrap();

        let request = Request::get("/widgets/42").body(Body::empty()).unwrap();
        let response = dispatcher.handle(request).await;
        assert_eq!(response.status(), 200);

        let body = json_body(response).await;
        assert_eq!(body["event"]["pathParameters"], json!({ "id": "42" }));
        assert!(body["event"]["requestContext"].get("authorizer").is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_denied_never_reaches_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::new(
            &GatewayConfig::default(),
            index(),
            echo_handler(calls.clone()),
            Some(authorizer("Deny")),
        )
        .unwrap();

        let request = Request::delete("/widgets/42").body(Body::empty()).unwrap();
        let response = dispatcher.handle(request).await;
        assert_eq!(response.status(), 401);
        assert_eq!(json_body(response).await, json!({ "message": "Unauthorized" }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_policies_are_denied() {
        let replies = [
            json!({ "principalId": "u", "policyDocument": { "Statement": [{ "Effect": null }] } }),
            json!({ "principalId": "u", "policyDocument": { "Statement": [{ "Effect": 1 }] } }),
            json!({ "principalId": "u", "policyDocument": { "Statement": { "Effect": "Deny" } } }),
            json!({ "principalId": "u", "policyDocument": null }),
            json!(null),
        ];

        for reply in replies {
            let calls = Arc::new(AtomicUsize::new(0));
            let dispatcher = Dispatcher::new(
                &GatewayConfig::default(),
                index(),
                echo_handler(calls.clone()),
                Some(replying_authorizer(reply.clone())),
            )
            .unwrap();

            let response = dispatcher
                .handle(Request::delete("/widgets/42").body(Body::empty()).unwrap())
                .await;
            assert_eq!(response.status(), 401, "{reply}");
            assert_eq!(calls.load(Ordering::SeqCst), 0, "{reply}");
        }
    }

    #[tokio::test]
    async fn test_loosely_typed_allow_reaches_handler() {
        let replies = [
            json!({ "principalId": 42, "policyDocument": { "Statement": [{ "Effect": "Allow" }] } }),
            json!({
                "principalId": "user-1",
                "policyDocument": { "Statement": [{ "Effect": "Allow" }] },
                "context": null
            }),
        ];

        for reply in replies {
            let calls = Arc::new(AtomicUsize::new(0));
            let dispatcher = Dispatcher::new(
                &GatewayConfig::default(),
                index(),
                echo_handler(calls.clone()),
                Some(replying_authorizer(reply.clone())),
            )
            .unwrap();

            let response = dispatcher
                .handle(Request::delete("/widgets/42").body(Body::empty()).unwrap())
                .await;
            assert_eq!(response.status(), 200, "{reply}");
            assert_eq!(calls.load(Ordering::SeqCst), 1, "{reply}");
        }
    }

    #[tokio::test]
    async fn test_allowed_carries_principal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::new(
            &GatewayConfig::default(),
            index(),
            echo_handler(calls.clone()),
            Some(authorizer("Allow")),
        )
        .unwrap();

        let request = Request::delete("/widgets/42").body(Body::empty()).unwrap();
        let response = dispatcher.handle(request).await;
        assert_eq!(response.status(), 200);

        let body = json_body(response).await;
        assert_eq!(
            body["event"]["requestContext"]["authorizer"],
            json!({ "principalId": "user-1", "role": "admin" })
        );
    }

    #[tokio::test]
    async fn test_handler_failure_is_generic_500() {
        let handler = Handler::new(Arc::new(LocalFunction::new("boom", |_| async {
            Err(crate::functions::FunctionError::raised("database password is hunter2"))
        })));
        let dispatcher =
            Dispatcher::new(&GatewayConfig::default(), index(), handler, Some(authorizer("Allow")))
                .unwrap();

        let response = dispatcher
            .handle(Request::get("/widgets/1").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), 500);
        assert_eq!(json_body(response).await, json!({ "error": "Internal server error" }));
    }

    #[tokio::test]
    async fn test_unresolved_routes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::new(
            &GatewayConfig::default(),
            index(),
            echo_handler(calls.clone()),
            Some(authorizer("Allow")),
        )
        .unwrap();

        let response = dispatcher
            .handle(Request::get("/gadgets/1").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), 404);

        let response = dispatcher
            .handle(Request::post("/widgets/1").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), 405);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
