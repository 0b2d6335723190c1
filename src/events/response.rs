//! Handler results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What the business handler returns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResult {
    pub status_code: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl HandlerResult {
    /// `Content-Type` header, matched case-insensitively.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.as_str())
    }

    /// Whether the handler declared an XML content type.
    pub fn is_xml(&self) -> bool {
        self.content_type()
            .map(|ct| ct.to_ascii_lowercase())
            .is_some_and(|ct| {
                let essence = ct.split(';').next().unwrap_or_default().trim();
                essence.ends_with("/xml") || essence.ends_with("+xml")
            })
    }
}
