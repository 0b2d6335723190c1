//! In-process functions backed by an async closure.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use serde_json::Value;

use crate::functions::{FunctionError, LambdaFunction};

type BoxedFuture = Pin<Box<dyn Future<Output = Result<Value, FunctionError>> + Send>>;
type BoxedCall = Box<dyn Fn(Value) -> BoxedFuture + Send + Sync>;

/// A function implemented by a closure, for embedding the gateway or for tests.
pub struct LocalFunction {
    name: String,
    call: BoxedCall,
}

impl LocalFunction {
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, FunctionError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            call: Box::new(move |payload| Box::pin(f(payload))),
        }
    }
}

#[async_trait]
impl LambdaFunction for LocalFunction {
    async fn invoke(&self, payload: Value) -> Result<Value, FunctionError> {
        (self.call)(payload).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
