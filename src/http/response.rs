//! Response handling and transformation.
//!
//! # Responsibilities
//! - Turn a handler result into the HTTP response sent to the client
//!
//! # Design Decisions
//! - XML content types are written verbatim with the handler's content type
//! - Everything else is parsed as JSON and re-encoded as a JSON response
//! - A body that is not JSON is an invalid response (500), not a passthrough

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use crate::error::GatewayError;
use crate::events::HandlerResult;

pub fn into_http_response(result: HandlerResult) -> Result<Response, GatewayError> {
    let status = StatusCode::from_u16(result.status_code).map_err(|_| {
        GatewayError::InvalidResponse(format!("status code {} out of range", result.status_code))
    })?;

    if result.is_xml() {
        let content_type = result.content_type().unwrap_or("application/xml");
        let content_type = HeaderValue::from_str(content_type).map_err(|_| {
            GatewayError::InvalidResponse(format!("content type {content_type:?} is not a header value"))
        })?;
        let body = result.body.unwrap_or_default();
        return Ok((status, [(header::CONTENT_TYPE, content_type)], body).into_response());
    }

    match result.body.as_deref() {
        None | Some("") => Ok(status.into_response()),
        Some(body) => {
            let value: Value = serde_json::from_str(body)
                .map_err(|e| GatewayError::InvalidResponse(format!("body is not JSON: {e}")))?;
            Ok((status, Json(value)).into_response())
        }
    }
}
