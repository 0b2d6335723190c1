//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::net::TcpListener;

use lambda_gateway::config::GatewayConfig;
use lambda_gateway::functions::{FunctionError, LambdaFunction, LocalFunction};
use lambda_gateway::{Functions, HttpServer, Shutdown};

/// A running gateway on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a gateway serving `document` with the given functions.
pub async fn start_gateway(document: Value, functions: Functions) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut config = GatewayConfig::default();
    config.listener.bind_address = addr.to_string();

    let server = HttpServer::new(config, document, functions).unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    TestGateway { addr, shutdown }
}

/// Every event a function has received, in order.
#[derive(Clone, Default)]
pub struct Calls(Arc<Mutex<Vec<Value>>>);

impl Calls {
    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn last(&self) -> Value {
        self.0.lock().unwrap().last().cloned().unwrap_or(Value::Null)
    }
}

/// A handler that records each event and answers with `respond(event)`.
pub fn recording_handler<F>(calls: Calls, respond: F) -> Arc<dyn LambdaFunction>
where
    F: Fn(&Value) -> Value + Send + Sync + 'static,
{
    let respond = Arc::new(respond);
    Arc::new(LocalFunction::new("handler", move |event: Value| {
        let calls = calls.clone();
        let respond = respond.clone();
        async move {
            let result = respond(&event);
            calls.0.lock().unwrap().push(event);
            Ok::<_, FunctionError>(result)
        }
    }))
}

/// An authorizer that always returns `effect` for the first statement.
pub fn policy_authorizer(effect: &'static str) -> Arc<dyn LambdaFunction> {
    Arc::new(LocalFunction::new("authorizer", move |event: Value| async move {
        Ok::<_, FunctionError>(json!({
            "principalId": "user-1",
            "policyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Action": "execute-api:Invoke",
                    "Effect": effect,
                    "Resource": event["methodArn"].clone(),
                }]
            },
            "context": { "tenant": "acme" }
        }))
    }))
}

/// A small API with public, secured and upload operations.
pub fn widgets_document() -> Value {
    json!({
        "openapi": "3.0.1",
        "servers": [{ "url": "https://api.example.com" }],
        "paths": {
            "/widgets": {
                "get": { "operationId": "Widgets.list" },
                "post": { "operationId": "Widgets.create" }
            },
            "/widgets/{id}": {
                "get": { "operationId": "Widgets.get" }
            },
            "/widgets/{id}/report": {
                "get": { "operationId": "Widgets.report" }
            },
            "/private": {
                "get": { "operationId": "Private.get", "security": [{ "jwt": [] }] }
            },
            "/uploads": {
                "post": { "operationId": "Uploads.create" }
            }
        }
    })
}
