use std::fmt;

use serde_json::Value as JsonValue;
use serde_json_path::JsonPath;

use super::to_json_str;
use crate::error::DefinitionError;
use crate::failure::FailureEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathTarget {
    /// `$...`, the current input value.
    Input,
    /// `$$...`, the frame's context object.
    Context,
}

/// A JSONPath over the current input or the context object.
pub struct InputPath {
    raw: String,
    target: PathTarget,
    definite: bool,
    path: JsonPath,
}

impl InputPath {
    pub fn parse(raw: &str) -> Result<Self, DefinitionError> {
        let trimmed = raw.trim();
        let (target, query) = if let Some(rest) = trimmed.strip_prefix("$$") {
            (PathTarget::Context, format!("${rest}"))
        } else if trimmed.starts_with('$') {
            (PathTarget::Input, trimmed.to_string())
        } else {
            return Err(DefinitionError::InvalidPath {
                path: raw.to_string(),
                message: "path must start with '$'".to_string(),
            });
        };

        let path = JsonPath::parse(&query).map_err(|e| DefinitionError::InvalidPath {
            path: raw.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            raw: trimmed.to_string(),
            target,
            definite: is_singular(&query),
            path,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn target(&self) -> PathTarget {
        self.target
    }

    /// Selects from `input` or `context` depending on the path's target.
    pub fn evaluate(
        &self,
        input: &JsonValue,
        context: &JsonValue,
    ) -> Result<JsonValue, FailureEvent> {
        match self.target {
            PathTarget::Input => self.extract(input),
            PathTarget::Context => self.extract(context),
        }
    }

    /// A definite path yields its single node; an indefinite one (wildcards,
    /// slices, filters, descendants) yields the array of all matches.
    pub fn extract(&self, value: &JsonValue) -> Result<JsonValue, FailureEvent> {
        let nodes = self.path.query(value);
        if nodes.is_empty() {
            return Err(FailureEvent::runtime(format!(
                "The JSONPath '{}' could not be found in the input '{}'",
                self.raw,
                to_json_str(value)
            )));
        }
        if self.definite {
            if let Ok(node) = nodes.exactly_one() {
                return Ok(node.clone());
            }
        }
        Ok(JsonValue::Array(nodes.all().into_iter().cloned().collect()))
    }
}

impl fmt::Debug for InputPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InputPath").field(&self.raw).finish()
    }
}

impl fmt::Display for InputPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Whether the already-validated `query` selects at most one node.
///
/// A filter comparison only accepts singular queries, so the query parses
/// as one side of a comparison exactly when it is singular.
fn is_singular(query: &str) -> bool {
    JsonPath::parse(&format!("$[?{query} == null]")).is_ok()
}
