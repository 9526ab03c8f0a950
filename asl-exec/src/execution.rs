use std::sync::Arc;

use asl_core::{FailureEvent, HistoryEventType};
use serde_json::{json, Value as JsonValue};
use tracing::{info, warn};
use uuid::Uuid;

use crate::context::ExecutionContext;
use crate::env::Environment;
use crate::history::{HistoryEntry, HistorySink, NoOpHistorySink};
use crate::node::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Succeeded,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Succeeded => "SUCCEEDED",
            ExecutionStatus::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub execution_id: Uuid,
    pub status: ExecutionStatus,
    pub output: Option<JsonValue>,
    /// The terminal failure, when the execution failed.
    pub failure: Option<FailureEvent>,
    pub history: Vec<HistoryEntry>,
}

impl ExecutionOutcome {
    pub fn error(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.error_name.as_str())
    }

    pub fn cause(&self) -> Option<&str> {
        self.failure.as_ref().and_then(|f| f.cause())
    }

    pub fn event_types(&self) -> Vec<HistoryEventType> {
        self.history.iter().map(|e| e.event.event_type).collect()
    }
}

/// Drives one definition over one input.
pub struct Execution {
    context: Arc<ExecutionContext>,
    program: Arc<Node>,
    history_sink: Arc<dyn HistorySink>,
}

impl Execution {
    pub fn new(context: ExecutionContext, program: Node) -> Self {
        Self {
            context: Arc::new(context),
            program: Arc::new(program),
            history_sink: Arc::new(NoOpHistorySink),
        }
    }

    pub fn with_history_sink(mut self, sink: Arc<dyn HistorySink>) -> Self {
        self.history_sink = sink;
        self
    }

    pub fn execution_id(&self) -> Uuid {
        self.context.execution_id
    }

    pub async fn run(&self, input: JsonValue) -> ExecutionOutcome {
        let execution_id = self.context.execution_id;
        let mut env = Environment::new(Arc::clone(&self.context), input.clone());
        env.record(HistoryEventType::ExecutionStarted, json!({ "input": input }));
        info!(%execution_id, "execution started");

        let result = match self.program.eval(&mut env).await {
            Ok(()) => env.pop(),
            Err(failure) => Err(failure),
        };

        let (status, output, failure) = match result {
            Ok(output) => {
                env.record(
                    HistoryEventType::ExecutionSucceeded,
                    json!({ "output": output }),
                );
                info!(%execution_id, "execution succeeded");
                (ExecutionStatus::Succeeded, Some(output), None)
            }
            Err(failure) => {
                env.record(HistoryEventType::ExecutionFailed, failure.details_json());
                warn!(
                    %execution_id,
                    error = %failure.error_name,
                    cause = failure.cause().unwrap_or_default(),
                    index = ?failure.index(),
                    "execution failed"
                );
                (ExecutionStatus::Failed, None, Some(failure))
            }
        };

        let history = env.into_events().into_entries();
        for entry in &history {
            self.history_sink.emit(execution_id, entry.clone()).await;
        }

        ExecutionOutcome {
            execution_id,
            status,
            output,
            failure,
            history,
        }
    }
}
