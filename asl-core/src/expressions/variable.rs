use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value as JsonValue;
use serde_json_path::JsonPath;

use crate::error::DefinitionError;
use crate::failure::FailureEvent;

static VARIABLE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

pub type Variables = BTreeMap<String, JsonValue>;

/// `$name` or `$name.<path>`: a read of a bound variable.
pub struct VariableSample {
    raw: String,
    name: String,
    path: Option<JsonPath>,
}

impl VariableSample {
    pub fn parse(raw: &str) -> Result<Self, DefinitionError> {
        let invalid = || DefinitionError::InvalidVariable(raw.to_string());

        let body = raw.trim().strip_prefix('$').ok_or_else(invalid)?;
        if body.starts_with('$') {
            return Err(invalid());
        }
        let split = body.find(['.', '[']).unwrap_or(body.len());
        let (name, rest) = body.split_at(split);
        if !VARIABLE_NAME_RE.is_match(name) {
            return Err(invalid());
        }

        let path = if rest.is_empty() {
            None
        } else {
            Some(JsonPath::parse(&format!("${rest}")).map_err(|_| invalid())?)
        };

        Ok(Self {
            raw: raw.trim().to_string(),
            name: name.to_string(),
            path,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample(&self, variables: &Variables) -> Result<JsonValue, FailureEvent> {
        let value = variables.get(&self.name).ok_or_else(|| {
            FailureEvent::query_evaluation(format!(
                "The variable '{}' is not defined in the current scope",
                self.name
            ))
        })?;

        let Some(path) = &self.path else {
            return Ok(value.clone());
        };
        path.query(value)
            .exactly_one()
            .map(|v| v.clone())
            .map_err(|_| {
                FailureEvent::query_evaluation(format!(
                    "The variable reference '{}' could not be resolved",
                    self.raw
                ))
            })
    }
}

impl fmt::Debug for VariableSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VariableSample").field(&self.raw).finish()
    }
}
