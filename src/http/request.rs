//! Request handling and transformation.
//!
//! # Responsibilities
//! - Read the request ID set by the request-id layer
//! - Collect headers and query parameters into plain mappings
//! - Buffer multipart payloads whole; parse JSON payloads
//!
//! # Design Decisions
//! - Header names arrive from the transport already lowercased and are not touched further
//! - Repeated headers are joined with ", "; repeated query keys keep the last value
//! - Bodies of other content types are not read and dispatch as `{}`

use std::collections::BTreeMap;
use std::error::Error as _;
use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, request::Parts, HeaderMap, Uri},
};
use http_body_util::LengthLimitError;
use serde_json::{Map, Value};

use crate::error::GatewayError;
use crate::events::GatewayRequest;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase())
}

/// Whether the request carries a multipart payload.
pub fn is_multipart(headers: &HeaderMap) -> bool {
    content_type(headers).is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

/// Whether the request declares a JSON payload.
pub fn is_json(headers: &HeaderMap) -> bool {
    content_type(headers).is_some_and(|ct| {
        let essence = ct.split(';').next().unwrap_or_default().trim();
        essence == "application/json" || essence.ends_with("+json")
    })
}

/// Request ID assigned by the request-id layer, or a fresh one.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Headers as a name → value mapping.
pub fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    map
}

/// Query string as a name → value mapping; empty when absent.
pub fn query_map(uri: &Uri) -> BTreeMap<String, String> {
    uri.query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

async fn buffer(body: Body, limit: usize) -> Result<Vec<u8>, GatewayError> {
    axum::body::to_bytes(body, limit)
        .await
        .map(|bytes| bytes.to_vec())
        .map_err(|e| {
            if exceeds_limit(&e) {
                GatewayError::PayloadTooLarge { limit }
            } else {
                GatewayError::BodyRead(e.to_string())
            }
        })
}

fn exceeds_limit(error: &axum::Error) -> bool {
    let mut source = error.source();
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

/// Build the pipeline's view of a request.
pub async fn read_request(
    parts: &Parts,
    body: Body,
    max_body_size: usize,
) -> Result<GatewayRequest, GatewayError> {
    let mut request = GatewayRequest::new(parts.method.clone(), parts.uri.path());
    request.headers = header_map(&parts.headers);
    request.query = query_map(&parts.uri);
    request.request_id = request_id(&parts.headers);
    request.source_ip = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    if is_multipart(&parts.headers) {
        request.binary_body = Some(buffer(body, max_body_size).await?);
    } else if is_json(&parts.headers) {
        let bytes = buffer(body, max_body_size).await?;
        if !bytes.iter().all(u8::is_ascii_whitespace) {
            request.body = serde_json::from_slice(&bytes).map_err(GatewayError::InvalidBody)?;
        }
    } else {
        request.body = Value::Object(Map::new());
    }

    Ok(request)
}
