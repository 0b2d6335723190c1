//! Path template matching.
//!
//! # Responsibilities
//! - Parse route templates (`/widgets/{id}`) into segments
//! - Score a concrete request path against a template (used by the router)
//! - Extract the `id` path parameter for the invocation event
//!
//! # Design Decisions
//! - Leading and trailing separators are stripped before splitting
//! - Only the reserved `{id}` placeholder produces a path parameter
//! - Segment count mismatches fail with `MalformedPath` instead of guessing

use std::collections::BTreeMap;
use std::fmt;

use crate::error::GatewayError;

/// Template segment that binds the single supported path parameter.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Name the `{id}` placeholder is bound to.
pub const ID_PARAMETER: &str = "id";

/// Named path parameters extracted from a request.
pub type PathParameters = BTreeMap<String, String>;

/// Split a path on `/` after stripping leading and trailing separators.
///
/// `"/"` and `""` both yield a single empty segment.
pub fn split_segments(path: &str) -> Vec<&str> {
    path.trim_matches('/').split('/').collect()
}

/// One segment of a [`PathTemplate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    /// A `{name}` placeholder, stored without braces.
    Placeholder(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) if !name.is_empty() => Segment::Placeholder(name.to_string()),
            _ => Segment::Literal(raw.to_string()),
        }
    }
}

/// A parsed route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(template: &str) -> Self {
        Self {
            raw: template.to_string(),
            segments: split_segments(template).into_iter().map(Segment::parse).collect(),
        }
    }

    /// The template exactly as declared.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Position of the `{id}` placeholder, if the template has one.
    pub fn id_position(&self) -> Option<usize> {
        self.segments
            .iter()
            .position(|s| matches!(s, Segment::Placeholder(name) if name == ID_PARAMETER))
    }

    /// Number of literal segments that match `path`, or `None` when the path
    /// does not fit this template. Placeholders match any single segment.
    pub fn match_score(&self, path: &[&str]) -> Option<usize> {
        if path.len() != self.segments.len() {
            return None;
        }

        let mut literals = 0;
        for (segment, actual) in self.segments.iter().zip(path) {
            match segment {
                Segment::Literal(expected) if expected == actual => literals += 1,
                Segment::Literal(_) => return None,
                Segment::Placeholder(_) => {}
            }
        }
        Some(literals)
    }

    /// Extract path parameters for a concrete request path.
    pub fn extract(&self, path: &str) -> Result<PathMatch, GatewayError> {
        let parts = split_segments(path);
        if parts.len() != self.segments.len() {
            return Err(GatewayError::MalformedPath {
                template: self.raw.clone(),
                path: path.to_string(),
            });
        }

        let mut matched = PathMatch::default();
        if let Some(position) = self.id_position() {
            matched.has_parameter = true;
            matched
                .parameters
                .insert(ID_PARAMETER.to_string(), parts[position].to_string());
        }
        Ok(matched)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Result of matching a request path against a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMatch {
    pub has_parameter: bool,
    pub parameters: PathParameters,
}

impl PathMatch {
    /// Parameters as they appear in an invocation event: `None` when empty.
    pub fn into_event_parameters(self) -> Option<PathParameters> {
        if self.parameters.is_empty() {
            None
        } else {
            Some(self.parameters)
        }
    }
}

/// Match `path` against the template string `template`.
pub fn extract_path_parameters(template: &str, path: &str) -> Result<PathMatch, GatewayError> {
    PathTemplate::parse(template).extract(path)
}
