//! The mutable state one evaluation frame works against.

use std::sync::Arc;

use asl_core::expressions::Variables;
use asl_core::{FailureEvent, HistoryEventType};
use serde_json::{json, Value as JsonValue};

use crate::context::ExecutionContext;
use crate::history::EventLog;

/// Working stack, variable bindings, context object and event log of one
/// evaluation frame.
///
/// The value at the top of the stack is the current input. Bindings are
/// shared copy-on-write with child frames, so a child never observes a
/// binding made after it was created and never makes one visible to its
/// siblings.
pub struct Environment {
    stack: Vec<JsonValue>,
    variables: Arc<Variables>,
    context_object: JsonValue,
    events: EventLog,
    runtime: Arc<ExecutionContext>,
}

impl Environment {
    pub fn new(runtime: Arc<ExecutionContext>, input: JsonValue) -> Self {
        let context_object = json!({
            "Execution": {
                "Id": runtime.execution_id.to_string(),
                "Input": input.clone(),
            }
        });
        Self {
            stack: vec![input],
            variables: Arc::new(Variables::new()),
            context_object,
            events: EventLog::default(),
            runtime,
        }
    }

    /// A frame for Map branch `index`, seeded with `item` as its input.
    pub fn child(&self, index: usize, item: JsonValue) -> Self {
        let mut context_object = self.context_object.clone();
        if let Some(obj) = context_object.as_object_mut() {
            obj.remove("Task");
            obj.insert(
                "Map".to_string(),
                json!({ "Item": { "Index": index, "Value": item.clone() } }),
            );
        }
        Self {
            stack: vec![item],
            variables: Arc::clone(&self.variables),
            context_object,
            events: EventLog::default(),
            runtime: Arc::clone(&self.runtime),
        }
    }

    pub fn runtime(&self) -> &Arc<ExecutionContext> {
        &self.runtime
    }

    pub fn push(&mut self, value: JsonValue) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Result<JsonValue, FailureEvent> {
        self.stack
            .pop()
            .ok_or_else(|| FailureEvent::runtime("evaluation stack is empty"))
    }

    pub fn peek(&self) -> Result<&JsonValue, FailureEvent> {
        self.stack
            .last()
            .ok_or_else(|| FailureEvent::runtime("evaluation stack is empty"))
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub(crate) fn truncate(&mut self, depth: usize) {
        self.stack.truncate(depth);
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn bind(&mut self, name: impl Into<String>, value: JsonValue) {
        Arc::make_mut(&mut self.variables).insert(name.into(), value);
    }

    pub fn context_object(&self) -> &JsonValue {
        &self.context_object
    }

    pub fn set_context(&mut self, key: &str, value: JsonValue) {
        if let Some(obj) = self.context_object.as_object_mut() {
            obj.insert(key.to_string(), value);
        }
    }

    pub fn clear_context(&mut self, key: &str) {
        if let Some(obj) = self.context_object.as_object_mut() {
            obj.remove(key);
        }
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn record(&mut self, event_type: HistoryEventType, details: JsonValue) {
        self.events.append(event_type, details);
    }

    pub fn merge_events(&mut self, log: EventLog) {
        self.events.extend(log);
    }

    pub fn into_events(self) -> EventLog {
        self.events
    }
}
