//! Operation discovery from an OpenAPI document.
//!
//! # Responsibilities
//! - Walk `paths` once, in document order
//! - Emit one descriptor per operation that declares an `operationId`
//! - Flag operations with a non-empty `security` list as requiring auth
//! - Index descriptors by name for per-request lookup

use std::collections::HashMap;

use axum::http::Method;
use serde_json::Value;
use thiserror::Error;

use crate::routing::matcher::PathTemplate;

/// Keys of a path item that name an operation.
const OPERATION_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Errors found while indexing the API document.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("failed to read API document {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("API document {path} is not valid JSON: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("API document has no `paths` object")]
    MissingPaths,

    #[error("operationId {0:?} is declared more than once")]
    DuplicateOperation(String),
}

/// A declared operation.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    pub name: String,
    pub path: String,
    pub method: Method,
    pub requires_auth: bool,
    template: PathTemplate,
}

impl OperationDescriptor {
    pub fn new(name: impl Into<String>, path: impl Into<String>, method: Method, requires_auth: bool) -> Self {
        let path = path.into();
        Self {
            name: name.into(),
            template: PathTemplate::parse(&path),
            path,
            method,
            requires_auth,
        }
    }

    /// Parsed form of [`OperationDescriptor::path`].
    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    /// `Widgets` for an operation named `Widgets.get`.
    pub fn class_name(&self) -> Option<&str> {
        self.name.split_once('.').map(|(class, _)| class)
    }

    /// `get` for `Widgets.get`, or the whole name when there is no class part.
    pub fn method_name(&self) -> &str {
        match self.name.split_once('.') {
            Some((_, rest)) => rest.split('.').next().unwrap_or(rest),
            None => &self.name,
        }
    }
}

/// Collect the named operations of `spec` in document order.
///
/// Operations without an `operationId` are skipped.
pub fn extract_operations(spec: &Value) -> Vec<OperationDescriptor> {
    let Some(paths) = spec.get("paths").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut operations = Vec::new();
    for (path, item) in paths {
        let Some(item) = item.as_object() else {
            continue;
        };
        for (key, operation) in item {
            if !OPERATION_METHODS.contains(&key.as_str()) {
                continue;
            }
            let Some(name) = operation.get("operationId").and_then(Value::as_str) else {
                continue;
            };
            let Ok(method) = Method::from_bytes(key.to_ascii_uppercase().as_bytes()) else {
                continue;
            };
            let requires_auth = operation
                .get("security")
                .and_then(Value::as_array)
                .is_some_and(|requirements| !requirements.is_empty());

            operations.push(OperationDescriptor::new(name, path.as_str(), method, requires_auth));
        }
    }
    operations
}

/// Read-only index of declared operations, built once at startup.
#[derive(Debug, Default)]
pub struct OperationIndex {
    operations: Vec<OperationDescriptor>,
    by_name: HashMap<String, usize>,
}

impl OperationIndex {
    /// Index the operations of an API document.
    pub fn from_spec(spec: &Value) -> Result<Self, SpecError> {
        if !spec.get("paths").is_some_and(Value::is_object) {
            return Err(SpecError::MissingPaths);
        }
        let index = Self::new(extract_operations(spec))?;

        if index.is_empty() {
            tracing::warn!("API document declares no named operations; every request will be a 404");
        } else {
            let names: Vec<&str> = index.iter().map(|op| op.name.as_str()).collect();
            tracing::info!(count = names.len(), operations = ?names, "Operations indexed");
        }
        Ok(index)
    }

    pub fn new(operations: Vec<OperationDescriptor>) -> Result<Self, SpecError> {
        let mut by_name = HashMap::with_capacity(operations.len());
        for (position, op) in operations.iter().enumerate() {
            if by_name.insert(op.name.clone(), position).is_some() {
                return Err(SpecError::DuplicateOperation(op.name.clone()));
            }
        }
        Ok(Self { operations, by_name })
    }

    pub fn get(&self, name: &str) -> Option<&OperationDescriptor> {
        self.by_name.get(name).map(|&i| &self.operations[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Names of operations that require authorization.
    pub fn secured(&self) -> Vec<String> {
        self.operations
            .iter()
            .filter(|op| op.requires_auth)
            .map(|op| op.name.clone())
            .collect()
    }
}
