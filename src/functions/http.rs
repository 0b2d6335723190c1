//! Functions behind a Lambda Invoke API endpoint.
//!
//! Works with anything that speaks
//! `POST /2015-03-31/functions/{name}/invocations`: the Lambda runtime
//! interface emulator, `cargo lambda watch`, or a SAM local endpoint.

use async_trait::async_trait;
use serde_json::Value;

use crate::functions::{FunctionError, LambdaFunction};

/// Header set by the Invoke API when the function raised.
const FUNCTION_ERROR_HEADER: &str = "x-amz-function-error";

pub struct HttpFunction {
    url: String,
    name: String,
    client: reqwest::Client,
}

impl HttpFunction {
    pub fn new(url: impl Into<String>) -> Result<Self, FunctionError> {
        let url = url.into();
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            name: function_name(&url),
            url,
            client,
        })
    }
}

/// `{name}` from `.../functions/{name}/invocations`, else the URL host.
fn function_name(url: &str) -> String {
    let Ok(parsed) = url::Url::parse(url) else {
        return url.to_string();
    };
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    match segments.as_slice() {
        [.., "functions", name, "invocations"] => (*name).to_string(),
        _ => parsed.host_str().unwrap_or(url).to_string(),
    }
}

#[async_trait]
impl LambdaFunction for HttpFunction {
    async fn invoke(&self, payload: Value) -> Result<Value, FunctionError> {
        tracing::debug!(function = %self.name, url = %self.url, "Invoking function over HTTP");

        let response = self.client.post(&self.url).json(&payload).send().await?;
        let status = response.status();
        let function_error = response
            .headers()
            .get(FUNCTION_ERROR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(FunctionError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        if let Some(kind) = function_error {
            let details: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            return Err(FunctionError::Raised {
                error_type: details
                    .get("errorType")
                    .and_then(Value::as_str)
                    .unwrap_or(kind.as_str())
                    .to_string(),
                message: details
                    .get("errorMessage")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_name_from_invoke_url() {
        assert_eq!(
            function_name("http://127.0.0.1:9000/2015-03-31/functions/widgets/invocations"),
            "widgets"
        );
        assert_eq!(function_name("http://lambda.local:9000/run"), "lambda.local");
        assert_eq!(function_name("not a url"), "not a url");
    }
}
