//! Operation resolution.
//!
//! # Responsibilities
//! - Map an incoming (method, path) pair onto a declared operation name
//! - Distinguish "no such path" (404) from "path exists, wrong method" (405)
//!
//! # Design Decisions
//! - Immutable after construction (shared without locks)
//! - Templates with more literal matches win over placeholder matches
//! - Ties resolve to the earliest operation in document order

use axum::http::Method;

use crate::error::GatewayError;
use crate::routing::matcher::{split_segments, PathTemplate};
use crate::routing::operations::OperationIndex;

#[derive(Debug)]
struct Route {
    template: PathTemplate,
    method: Method,
    operation: String,
}

/// Resolves requests to operation names.
#[derive(Debug, Default)]
pub struct OperationRouter {
    routes: Vec<Route>,
}

impl OperationRouter {
    pub fn new(index: &OperationIndex) -> Self {
        let routes = index
            .iter()
            .map(|op| Route {
                template: op.template().clone(),
                method: op.method.clone(),
                operation: op.name.clone(),
            })
            .collect();
        Self { routes }
    }

    /// Find the operation declared for `method` and `path`.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<&str, GatewayError> {
        let segments = split_segments(path);
        let mut path_matched = false;
        let mut best: Option<(usize, &Route)> = None;

        for route in &self.routes {
            let Some(score) = route.template.match_score(&segments) else {
                continue;
            };
            path_matched = true;
            if route.method != *method {
                continue;
            }
            match best {
                Some((top, _)) if top >= score => {}
                _ => best = Some((score, route)),
            }
        }

        match best {
            Some((_, route)) => Ok(&route.operation),
            None if path_matched => Err(GatewayError::MethodNotAllowed {
                method: method.to_string(),
                path: path.to_string(),
            }),
            None => Err(GatewayError::RouteNotFound {
                method: method.to_string(),
                path: path.to_string(),
            }),
        }
    }
}
