//! Classified failures raised by evaluation, and the history event types they
//! are recorded under.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Error names reserved by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatesErrorName {
    All,
    Runtime,
    TaskFailed,
    Timeout,
    HeartbeatTimeout,
    QueryEvaluationError,
}

impl StatesErrorName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatesErrorName::All => "States.ALL",
            StatesErrorName::Runtime => "States.Runtime",
            StatesErrorName::TaskFailed => "States.TaskFailed",
            StatesErrorName::Timeout => "States.Timeout",
            StatesErrorName::HeartbeatTimeout => "States.HeartbeatTimeout",
            StatesErrorName::QueryEvaluationError => "States.QueryEvaluationError",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "States.ALL" => StatesErrorName::All,
            "States.Runtime" => StatesErrorName::Runtime,
            "States.TaskFailed" => StatesErrorName::TaskFailed,
            "States.Timeout" => StatesErrorName::Timeout,
            "States.HeartbeatTimeout" => StatesErrorName::HeartbeatTimeout,
            "States.QueryEvaluationError" => StatesErrorName::QueryEvaluationError,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorName {
    States(StatesErrorName),
    Custom(String),
}

impl ErrorName {
    pub fn custom(name: impl Into<String>) -> Self {
        let name = name.into();
        match StatesErrorName::parse(&name) {
            Some(s) => ErrorName::States(s),
            None => ErrorName::Custom(name),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ErrorName::States(s) => s.as_str(),
            ErrorName::Custom(c) => c.as_str(),
        }
    }

    /// Whether an `ErrorEquals` entry of a retrier or catcher selects this error.
    ///
    /// `States.ALL` never selects `States.Runtime`; `States.TaskFailed` selects
    /// everything except runtime errors and timeouts.
    pub fn matches(&self, pattern: &str) -> bool {
        if pattern == self.as_str() {
            return true;
        }
        let is_runtime = matches!(self, ErrorName::States(StatesErrorName::Runtime));
        match StatesErrorName::parse(pattern) {
            Some(StatesErrorName::All) => !is_runtime,
            Some(StatesErrorName::TaskFailed) => {
                !is_runtime && !matches!(self, ErrorName::States(StatesErrorName::Timeout))
            }
            _ => false,
        }
    }
}

impl fmt::Display for ErrorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<StatesErrorName> for ErrorName {
    fn from(value: StatesErrorName) -> Self {
        ErrorName::States(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryEventType {
    ExecutionStarted,
    ExecutionSucceeded,
    ExecutionFailed,
    PassStateEntered,
    PassStateExited,
    FailStateEntered,
    MapStateEntered,
    MapStateStarted,
    MapIterationStarted,
    MapIterationSucceeded,
    MapIterationFailed,
    MapIterationAborted,
    MapStateSucceeded,
    MapStateFailed,
    TaskStateEntered,
    TaskScheduled,
    TaskStarted,
    TaskSubmitted,
    TaskSucceeded,
    TaskFailed,
    TaskTimedOut,
}

impl HistoryEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryEventType::ExecutionStarted => "ExecutionStarted",
            HistoryEventType::ExecutionSucceeded => "ExecutionSucceeded",
            HistoryEventType::ExecutionFailed => "ExecutionFailed",
            HistoryEventType::PassStateEntered => "PassStateEntered",
            HistoryEventType::PassStateExited => "PassStateExited",
            HistoryEventType::FailStateEntered => "FailStateEntered",
            HistoryEventType::MapStateEntered => "MapStateEntered",
            HistoryEventType::MapStateStarted => "MapStateStarted",
            HistoryEventType::MapIterationStarted => "MapIterationStarted",
            HistoryEventType::MapIterationSucceeded => "MapIterationSucceeded",
            HistoryEventType::MapIterationFailed => "MapIterationFailed",
            HistoryEventType::MapIterationAborted => "MapIterationAborted",
            HistoryEventType::MapStateSucceeded => "MapStateSucceeded",
            HistoryEventType::MapStateFailed => "MapStateFailed",
            HistoryEventType::TaskStateEntered => "TaskStateEntered",
            HistoryEventType::TaskScheduled => "TaskScheduled",
            HistoryEventType::TaskStarted => "TaskStarted",
            HistoryEventType::TaskSubmitted => "TaskSubmitted",
            HistoryEventType::TaskSucceeded => "TaskSucceeded",
            HistoryEventType::TaskFailed => "TaskFailed",
            HistoryEventType::TaskTimedOut => "TaskTimedOut",
        }
    }
}

impl fmt::Display for HistoryEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured payload carried by a failure and copied into its history entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureDetails {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    /// Map branch that raised the failure, set by the fan-out executor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{error_name}: {}", details.cause.as_deref().unwrap_or_default())]
pub struct FailureEvent {
    pub error_name: ErrorName,
    pub event_type: HistoryEventType,
    pub details: FailureDetails,
}

impl FailureEvent {
    pub fn new(
        error_name: impl Into<ErrorName>,
        event_type: HistoryEventType,
        cause: impl Into<String>,
    ) -> Self {
        let error_name = error_name.into();
        Self {
            details: FailureDetails {
                error: error_name.as_str().to_string(),
                cause: Some(cause.into()),
                ..FailureDetails::default()
            },
            error_name,
            event_type,
        }
    }

    /// `States.Runtime` failure recorded as an execution failure.
    pub fn runtime(cause: impl Into<String>) -> Self {
        Self::new(StatesErrorName::Runtime, HistoryEventType::ExecutionFailed, cause)
    }

    pub fn query_evaluation(cause: impl Into<String>) -> Self {
        Self::new(
            StatesErrorName::QueryEvaluationError,
            HistoryEventType::ExecutionFailed,
            cause,
        )
    }

    pub fn with_resource(
        mut self,
        resource: impl Into<String>,
        resource_type: impl Into<String>,
    ) -> Self {
        self.details.resource = Some(resource.into());
        self.details.resource_type = Some(resource_type.into());
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.details.index = Some(index);
        self
    }

    pub fn cause(&self) -> Option<&str> {
        self.details.cause.as_deref()
    }

    pub fn index(&self) -> Option<usize> {
        self.details.index
    }

    pub fn details_json(&self) -> JsonValue {
        serde_json::to_value(&self.details).unwrap_or(JsonValue::Null)
    }
}
