//! Authorizer events and policy results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::AuthConfig;
use crate::events::request::{InvocationEvent, RequestContext};
use crate::routing::PathParameters;

/// Effect that grants access. Compared exactly, case included.
pub const ALLOW: &str = "Allow";

/// Caller identity supplied by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub method_arn: String,
}

impl CallerIdentity {
    /// `arn:aws:execute-api:{region}:{account}:{api}/{stage}/{METHOD}{path}`
    pub fn for_request(auth: &AuthConfig, stage: &str, method: &str, path: &str) -> Self {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        Self {
            method_arn: format!(
                "arn:aws:execute-api:{}:{}:{}/{}/{}{}",
                auth.region, auth.account_id, auth.api_id, stage, method, path
            ),
        }
    }
}

/// Event passed to the authorizer function (REQUEST authorizer shape).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub method_arn: String,
    pub resource: String,
    pub path: String,
    pub http_method: String,
    pub headers: BTreeMap<String, String>,
    pub query_string_parameters: BTreeMap<String, String>,
    pub path_parameters: Option<PathParameters>,
    pub stage_variables: BTreeMap<String, String>,
    pub request_context: RequestContext,
}

impl AuthorizerEvent {
    /// Derive the authorizer event from a handler event.
    pub fn from_invocation(event: &InvocationEvent, caller: &CallerIdentity, auth: &AuthConfig) -> Self {
        let mut stage_variables = BTreeMap::new();
        stage_variables.insert("issuer".to_string(), auth.issuer.clone());
        stage_variables.insert("audience".to_string(), auth.audience.clone());

        Self {
            event_type: "REQUEST".to_string(),
            method_arn: caller.method_arn.clone(),
            resource: event.resource.clone(),
            path: event.path.clone(),
            http_method: event.http_method.clone(),
            headers: event.headers.clone(),
            query_string_parameters: event.query_string_parameters.clone(),
            path_parameters: event.path_parameters.clone(),
            stage_variables,
            request_context: event.request_context.clone(),
        }
    }
}

/// One statement of a policy document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PolicyStatement {
    #[serde(rename = "Effect", default, deserialize_with = "lenient::string")]
    pub effect: String,
    #[serde(rename = "Action", default)]
    pub action: Value,
    #[serde(rename = "Resource", default)]
    pub resource: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PolicyDocument {
    #[serde(
        rename = "Version",
        default,
        deserialize_with = "lenient::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<String>,
    #[serde(rename = "Statement", default, deserialize_with = "lenient::statements")]
    pub statement: Vec<PolicyStatement>,
}

/// What the authorizer returns.
///
/// Decoding never rejects a reply: a shape that cannot carry an `Allow`
/// decodes to something that is denied.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PolicyResult {
    #[serde(default, deserialize_with = "lenient::principal")]
    pub principal_id: String,
    #[serde(default, deserialize_with = "lenient::document")]
    pub policy_document: PolicyDocument,
    #[serde(default, deserialize_with = "lenient::object")]
    pub context: Map<String, Value>,
}

impl PolicyResult {
    /// Decode a raw authorizer reply. Anything but an object is an empty, denied policy.
    pub fn from_reply(reply: Value) -> Self {
        serde_json::from_value(reply).unwrap_or_default()
    }

    /// Effect of the first statement. Later statements are never consulted.
    pub fn effect(&self) -> Option<&str> {
        self.policy_document
            .statement
            .first()
            .map(|s| s.effect.as_str())
    }

    pub fn is_allowed(&self) -> bool {
        self.effect() == Some(ALLOW)
    }
}

mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::{Map, Value};

    use super::{PolicyDocument, PolicyStatement};

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(optional_string(d)?.unwrap_or_default())
    }

    pub fn optional_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            _ => None,
        })
    }

    /// Numbers and other scalars are kept in their JSON spelling.
    pub fn principal<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    pub fn object<'de, D: Deserializer<'de>>(d: D) -> Result<Map<String, Value>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Object(map) => map,
            _ => Map::new(),
        })
    }

    pub fn document<'de, D: Deserializer<'de>>(d: D) -> Result<PolicyDocument, D::Error> {
        match Value::deserialize(d)? {
            value @ Value::Object(_) => serde_json::from_value(value).map_err(D::Error::custom),
            _ => Ok(PolicyDocument::default()),
        }
    }

    /// A lone statement object counts as a one-element list.
    pub fn statements<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<PolicyStatement>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items.into_iter().map(statement).collect(),
            value @ Value::Object(_) => vec![statement(value)],
            _ => Vec::new(),
        })
    }

    fn statement(value: Value) -> PolicyStatement {
        serde_json::from_value(value).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn policy(value: Value) -> PolicyResult {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_method_arn() {
        let auth = AuthConfig::default();
        let caller = CallerIdentity::for_request(&auth, "dev", "GET", "/widgets/1");
        assert_eq!(
            caller.method_arn,
            "arn:aws:execute-api:il-central-1:123456789012:local/dev/GET/widgets/1"
        );
    }

    #[test]
    fn test_only_exact_allow_on_first_statement() {
        assert!(policy(json!({
            "principalId": "u",
            "policyDocument": { "Statement": [{ "Effect": "Allow", "Action": "execute-api:Invoke", "Resource": "*" }] }
        }))
        .is_allowed());

        assert!(!policy(json!({ "policyDocument": { "Statement": [{ "Effect": "Deny" }] } })).is_allowed());
        assert!(!policy(json!({ "policyDocument": { "Statement": [{ "Effect": "allow" }] } })).is_allowed());
        assert!(!policy(json!({ "policyDocument": { "Statement": [] } })).is_allowed());
        assert!(!policy(json!({})).is_allowed());
        assert!(!policy(json!({
            "policyDocument": { "Statement": [{ "Effect": "Deny" }, { "Effect": "Allow" }] }
        }))
        .is_allowed());
    }

    #[test]
    fn test_malformed_effects_are_denied() {
        for document in [
            json!({ "Statement": [{ "Effect": null }] }),
            json!({ "Statement": [{ "Effect": 1 }] }),
            json!({ "Statement": ["Allow"] }),
            json!({ "Statement": "Allow" }),
            json!(null),
            json!("Allow"),
        ] {
            let result = policy(json!({ "principalId": "u", "policyDocument": document.clone() }));
            assert!(!result.is_allowed(), "{document}");
        }
    }

    #[test]
    fn test_single_statement_object() {
        let result = policy(json!({ "policyDocument": { "Statement": { "Effect": "Allow" } } }));
        assert!(result.is_allowed());

        let result = policy(json!({ "policyDocument": { "Statement": { "Effect": "Deny" } } }));
        assert_eq!(result.effect(), Some("Deny"));
    }

    #[test]
    fn test_loose_principal_and_context() {
        let result = policy(json!({
            "principalId": 42,
            "policyDocument": { "Statement": [{ "Effect": "Allow" }] },
            "context": null
        }));
        assert!(result.is_allowed());
        assert_eq!(result.principal_id, "42");
        assert!(result.context.is_empty());
    }

    #[test]
    fn test_non_object_reply_is_denied() {
        assert!(!PolicyResult::from_reply(json!(null)).is_allowed());
        assert!(!PolicyResult::from_reply(json!("Allow")).is_allowed());
        assert!(PolicyResult::from_reply(json!({
            "policyDocument": { "Statement": [{ "Effect": "Allow" }] }
        }))
        .is_allowed());
    }

    #[test]
    fn test_resource_list_accepted() {
        let result = policy(json!({
            "principalId": "u",
            "policyDocument": {
                "Version": "2012-10-17",
                "Statement": [{ "Effect": "Allow", "Action": ["execute-api:Invoke"], "Resource": ["arn:a", "arn:b"] }]
            },
            "context": { "role": "admin", "level": 3 }
        }));
        assert!(result.is_allowed());
        assert_eq!(result.context["level"], json!(3));
    }
}
