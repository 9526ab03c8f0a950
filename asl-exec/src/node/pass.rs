use asl_core::expressions::PayloadTemplate;
use asl_core::{DefinitionError, ErrorName, FailureEvent, HistoryEventType};
use serde_json::{json, Value as JsonValue};

use crate::env::Environment;

/// Passes its input (or a fixed result) through, optionally binding variables.
///
/// This is the only node that mutates variable bindings. All assignments are
/// evaluated against the state input before any of them is bound.
#[derive(Debug)]
pub struct PassState {
    pub name: String,
    pub result: Option<PayloadTemplate>,
    pub assign: Vec<(String, PayloadTemplate)>,
}

impl PassState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            result: None,
            assign: Vec::new(),
        }
    }

    pub fn with_result(mut self, result: &JsonValue) -> Result<Self, DefinitionError> {
        self.result = Some(PayloadTemplate::from_json(result)?);
        Ok(self)
    }

    pub fn with_assign(
        mut self,
        name: impl Into<String>,
        value: &JsonValue,
    ) -> Result<Self, DefinitionError> {
        self.assign.push((name.into(), PayloadTemplate::from_json(value)?));
        Ok(self)
    }

    pub(crate) fn eval(&self, env: &mut Environment) -> Result<(), FailureEvent> {
        let input = env.peek()?.clone();
        env.record(
            HistoryEventType::PassStateEntered,
            json!({ "name": self.name, "input": input }),
        );

        let output = match &self.result {
            Some(result) => result.evaluate(&input, env.context_object(), env.variables())?,
            None => input.clone(),
        };
        let mut bindings = Vec::with_capacity(self.assign.len());
        for (name, value) in &self.assign {
            let bound = value.evaluate(&input, env.context_object(), env.variables())?;
            bindings.push((name.clone(), bound));
        }
        for (name, value) in bindings {
            env.bind(name, value);
        }

        env.record(
            HistoryEventType::PassStateExited,
            json!({ "name": self.name, "output": output }),
        );
        env.push(output);
        Ok(())
    }
}

/// Terminates with a custom error.
#[derive(Debug)]
pub struct FailState {
    pub name: String,
    pub error: String,
    pub cause: String,
}

impl FailState {
    pub fn new(
        name: impl Into<String>,
        error: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            error: error.into(),
            cause: cause.into(),
        }
    }

    pub(crate) fn eval(&self, env: &mut Environment) -> Result<(), FailureEvent> {
        let input = env.peek()?.clone();
        env.record(
            HistoryEventType::FailStateEntered,
            json!({ "name": self.name, "input": input }),
        );
        Err(FailureEvent::new(
            ErrorName::custom(self.error.clone()),
            HistoryEventType::ExecutionFailed,
            self.cause.clone(),
        ))
    }
}
