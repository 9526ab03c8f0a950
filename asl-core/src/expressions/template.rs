use serde_json::{Map, Value as JsonValue};

use super::{InputPath, VariableSample, Variables};
use crate::error::DefinitionError;
use crate::failure::FailureEvent;

/// A payload with embedded expressions, such as a task's `Parameters`.
///
/// Keys ending in `.$` take an expression: `$...` and `$$...` are paths,
/// any other `$name...` is a variable sample.
#[derive(Debug)]
pub enum PayloadTemplate {
    Value(JsonValue),
    Path(InputPath),
    Variable(VariableSample),
    Object(Vec<(String, PayloadTemplate)>),
    Array(Vec<PayloadTemplate>),
}

impl PayloadTemplate {
    pub fn from_json(value: &JsonValue) -> Result<Self, DefinitionError> {
        match value {
            JsonValue::Object(map) => {
                let mut fields = Vec::with_capacity(map.len());
                for (key, v) in map {
                    match key.strip_suffix(".$") {
                        Some(name) => fields.push((name.to_string(), Self::expression(key, v)?)),
                        None => fields.push((key.clone(), Self::from_json(v)?)),
                    }
                }
                Ok(PayloadTemplate::Object(fields))
            }
            JsonValue::Array(items) => Ok(PayloadTemplate::Array(
                items.iter().map(Self::from_json).collect::<Result<_, _>>()?,
            )),
            other => Ok(PayloadTemplate::Value(other.clone())),
        }
    }

    fn expression(key: &str, value: &JsonValue) -> Result<Self, DefinitionError> {
        let JsonValue::String(expr) = value else {
            return Err(DefinitionError::InvalidPath {
                path: key.to_string(),
                message: "the value of a '.$' field must be a string".to_string(),
            });
        };
        let expr = expr.trim();
        if expr == "$"
            || expr.starts_with("$.")
            || expr.starts_with("$[")
            || expr.starts_with("$$")
        {
            Ok(PayloadTemplate::Path(InputPath::parse(expr)?))
        } else {
            Ok(PayloadTemplate::Variable(VariableSample::parse(expr)?))
        }
    }

    pub fn evaluate(
        &self,
        input: &JsonValue,
        context: &JsonValue,
        variables: &Variables,
    ) -> Result<JsonValue, FailureEvent> {
        match self {
            PayloadTemplate::Value(v) => Ok(v.clone()),
            PayloadTemplate::Path(p) => p.evaluate(input, context),
            PayloadTemplate::Variable(v) => v.sample(variables),
            PayloadTemplate::Object(fields) => {
                let mut out = Map::new();
                for (key, tpl) in fields {
                    out.insert(key.clone(), tpl.evaluate(input, context, variables)?);
                }
                Ok(JsonValue::Object(out))
            }
            PayloadTemplate::Array(items) => Ok(JsonValue::Array(
                items
                    .iter()
                    .map(|tpl| tpl.evaluate(input, context, variables))
                    .collect::<Result<_, _>>()?,
            )),
        }
    }
}
