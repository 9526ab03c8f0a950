use asl_core::config::DEFAULT_MAX_CONCURRENCY;
use asl_core::expressions::{to_json_str, InputPath, VariableSample};
use asl_core::{DefinitionError, FailureEvent};
use serde_json::Value as JsonValue;

use crate::env::Environment;
use crate::node::Node;

/// How a Map state's `MaxConcurrency` is obtained. `0` means unlimited.
#[derive(Debug)]
pub enum ConcurrencyLimit {
    Literal(i64),
    /// Any expression node; its result is coerced to an integer.
    Expression(Box<Node>),
    /// A variable sample; its value is coerced to an integer.
    Variable(VariableSample),
    /// A field of the current input, which must be a non-negative integer.
    Path(InputPath),
}

impl Default for ConcurrencyLimit {
    fn default() -> Self {
        ConcurrencyLimit::Literal(DEFAULT_MAX_CONCURRENCY)
    }
}

impl ConcurrencyLimit {
    pub fn expression(node: Node) -> Self {
        ConcurrencyLimit::Expression(Box::new(node))
    }

    pub fn variable(sample: &str) -> Result<Self, DefinitionError> {
        Ok(ConcurrencyLimit::Variable(VariableSample::parse(sample)?))
    }

    pub fn path(path: &str) -> Result<Self, DefinitionError> {
        Ok(ConcurrencyLimit::Path(InputPath::parse(path)?))
    }

    /// Pushes the resolved limit.
    pub async fn eval(&self, env: &mut Environment) -> Result<(), FailureEvent> {
        let limit = self.resolve(env).await?;
        env.push(JsonValue::from(limit));
        Ok(())
    }

    /// Resolves the limit without leaving anything on the stack.
    ///
    /// Only the path form validates its value; the expression and variable
    /// forms coerce whatever they produce, negative numbers included.
    pub(crate) async fn resolve(&self, env: &mut Environment) -> Result<i64, FailureEvent> {
        match self {
            ConcurrencyLimit::Literal(n) => Ok(*n),
            ConcurrencyLimit::Expression(node) => {
                node.eval(env).await?;
                let value = env.pop()?;
                coerce_to_int(&value)
            }
            ConcurrencyLimit::Variable(sample) => coerce_to_int(&sample.sample(env.variables())?),
            ConcurrencyLimit::Path(path) => {
                let value = path.extract(env.peek()?)?;
                validate_path_value(path, &value)
            }
        }
    }
}

fn validate_path_value(path: &InputPath, value: &JsonValue) -> Result<i64, FailureEvent> {
    let number = match value {
        JsonValue::Number(n) if n.is_i64() || n.is_u64() => n.as_i64().unwrap_or(i64::MAX),
        // Booleans count as the integers 0 and 1.
        JsonValue::Bool(b) => i64::from(*b),
        JsonValue::String(s) => {
            return Err(FailureEvent::runtime(format!(
                "The MaxConcurrencyPath field refers to value \"{s}\" which is not a valid integer: {path}"
            )))
        }
        other => {
            return Err(FailureEvent::runtime(format!(
                "The MaxConcurrencyPath field refers to value \"{}\" which is not a valid integer: {path}",
                to_json_str(other)
            )))
        }
    };
    if number < 0 {
        return Err(FailureEvent::runtime(format!(
            "Expected non-negative integer for MaxConcurrency, got '{number}' instead."
        )));
    }
    Ok(number)
}

/// Integer coercion: integers pass, floats truncate, numeric strings parse,
/// booleans become 0 or 1.
pub(crate) fn coerce_to_int(value: &JsonValue) -> Result<i64, FailureEvent> {
    let coerced = match value {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        JsonValue::String(s) => s.trim().parse::<i64>().ok(),
        JsonValue::Bool(b) => Some(i64::from(*b)),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
    };
    coerced.ok_or_else(|| {
        FailureEvent::runtime(format!(
            "Cannot convert '{}' to an integer for MaxConcurrency",
            to_json_str(value)
        ))
    })
}
