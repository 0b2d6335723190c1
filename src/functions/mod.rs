//! Function invocation subsystem.
//!
//! # Data Flow
//! ```text
//! InvocationEvent / AuthorizerEvent
//!     → Handler / Authorizer (serialize to JSON)
//!     → LambdaFunction::invoke
//!         http.rs     (Lambda Invoke API endpoint)
//!         command.rs  (child process, stdin → stdout)
//!         local.rs    (in-process closure)
//!     → HandlerResult / PolicyResult (deserialize)
//! ```
//!
//! # Design Decisions
//! - Functions are opaque: one async method, JSON in, JSON out
//! - Concrete implementations are chosen at startup from configuration
//! - No retries and no timeout at this layer

pub mod command;
pub mod http;
pub mod local;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::{FunctionConfig, StageEnvironment};
use crate::events::{AuthorizerEvent, HandlerResult, InvocationEvent, PolicyResult};

pub use command::CommandFunction;
pub use http::HttpFunction;
pub use local::LocalFunction;

/// Errors raised while invoking a function.
#[derive(Debug, Error)]
pub enum FunctionError {
    #[error("invoke request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invoke endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The function itself raised.
    #[error("function raised {error_type}: {message}")]
    Raised { error_type: String, message: String },

    #[error("failed to run function process: {0}")]
    Process(#[source] std::io::Error),

    #[error("function process exited with {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },

    #[error("function payload is not the expected JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl FunctionError {
    /// A function-raised error with a generic type.
    pub fn raised(message: impl Into<String>) -> Self {
        FunctionError::Raised {
            error_type: "Error".to_string(),
            message: message.into(),
        }
    }
}

/// A deployed function: JSON event in, JSON result out.
#[async_trait]
pub trait LambdaFunction: Send + Sync {
    async fn invoke(&self, payload: Value) -> Result<Value, FunctionError>;

    /// Name used in logs.
    fn name(&self) -> &str;
}

/// Build the function described by `config`.
pub fn build_function(
    config: &FunctionConfig,
    env: &StageEnvironment,
) -> Result<Arc<dyn LambdaFunction>, FunctionError> {
    let function: Arc<dyn LambdaFunction> = match config {
        FunctionConfig::Http { url } => Arc::new(HttpFunction::new(url.clone())?),
        FunctionConfig::Command { program, args, cwd } => Arc::new(
            CommandFunction::new(program.clone(), args.clone())
                .current_dir(cwd.clone())
                .envs(env.vars().clone()),
        ),
    };
    Ok(function)
}

async fn call<I, O>(function: &dyn LambdaFunction, input: &I) -> Result<O, FunctionError>
where
    I: Serialize,
    O: DeserializeOwned,
{
    let payload = serde_json::to_value(input)?;
    let output = function.invoke(payload).await?;
    Ok(serde_json::from_value(output)?)
}

/// The business handler.
#[derive(Clone)]
pub struct Handler {
    function: Arc<dyn LambdaFunction>,
}

impl Handler {
    pub fn new(function: Arc<dyn LambdaFunction>) -> Self {
        Self { function }
    }

    pub async fn invoke(&self, event: &InvocationEvent) -> Result<HandlerResult, FunctionError> {
        call(self.function.as_ref(), event).await
    }

    pub fn name(&self) -> &str {
        self.function.name()
    }
}

/// The authorization function.
#[derive(Clone)]
pub struct Authorizer {
    function: Arc<dyn LambdaFunction>,
}

impl Authorizer {
    pub fn new(function: Arc<dyn LambdaFunction>) -> Self {
        Self { function }
    }

    /// Only a failed call is an error; a reply of any shape decodes to a policy.
    pub async fn invoke(&self, event: &AuthorizerEvent) -> Result<PolicyResult, FunctionError> {
        let reply = self.function.invoke(serde_json::to_value(event)?).await?;
        Ok(PolicyResult::from_reply(reply))
    }

    pub fn name(&self) -> &str {
        self.function.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_handler_decodes_result() {
        let function = LocalFunction::new("echo", |event: Value| async move {
            Ok(json!({ "statusCode": 200, "body": event["body"] }))
        });
        let handler = Handler::new(Arc::new(function));

        let event: InvocationEvent = serde_json::from_value(json!({
            "resource": "/w", "path": "/w", "httpMethod": "GET",
            "headers": {}, "queryStringParameters": {}, "pathParameters": null,
            "requestContext": {
                "accountId": "1", "apiId": "a", "stage": "dev", "requestId": "r",
                "resourcePath": "/w", "httpMethod": "GET", "path": "/w",
                "operationName": "op", "requestTimeEpoch": 0, "identity": {}
            },
            "body": "{\"x\":1}", "isBase64Encoded": false
        }))
        .unwrap();

        let result = handler.invoke(&event).await.unwrap();
        assert_eq!(result.status_code, 200);
        assert_eq!(result.body.as_deref(), Some(r#"{"x":1}"#));
        assert_eq!(handler.name(), "echo");
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_json_error() {
        let function = LocalFunction::new("broken", |_| async { Ok(json!("not an object")) });
        let authorizer = Authorizer::new(Arc::new(function));
        let event: AuthorizerEvent = serde_json::from_value(json!({
            "type": "REQUEST", "methodArn": "arn", "resource": "/", "path": "/",
            "httpMethod": "GET", "headers": {}, "queryStringParameters": {},
            "pathParameters": null, "stageVariables": {},
            "requestContext": {
                "accountId": "1", "apiId": "a", "stage": "dev", "requestId": "r",
                "resourcePath": "/", "httpMethod": "GET", "path": "/",
                "operationName": "op", "requestTimeEpoch": 0, "identity": {}
            }
        }))
        .unwrap();

        assert!(matches!(authorizer.invoke(&event).await, Err(FunctionError::Json(_))));
    }

    #[test]
    fn test_build_from_config() {
        let env = StageEnvironment::default();
        let http = build_function(&FunctionConfig::default(), &env).unwrap();
        assert_eq!(http.name(), "function");

        let command = build_function(
            &FunctionConfig::Command {
                program: "/usr/bin/node".into(),
                args: vec!["index.js".into()],
                cwd: None,
            },
            &env,
        )
        .unwrap();
        assert_eq!(command.name(), "node");
    }
}
