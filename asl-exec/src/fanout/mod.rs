//! Map states: one branch per array item, bounded by a concurrency limit.

mod limit;
mod slots;

pub use limit::ConcurrencyLimit;
pub use slots::{BranchPermit, BranchSlots};

use std::collections::BTreeSet;
use std::sync::Arc;

use asl_core::expressions::{to_json_str, InputPath};
use asl_core::{DefinitionError, FailureEvent, HistoryEventType};
use serde_json::{json, Value as JsonValue};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, warn};

use crate::env::Environment;
use crate::history::EventLog;
use crate::node::Node;

#[derive(Debug)]
pub struct MapState {
    pub name: String,
    /// Selects the item array from the input; the whole input when absent.
    pub items_path: Option<InputPath>,
    /// Falls back to the configured default when absent.
    pub max_concurrency: Option<ConcurrencyLimit>,
    pub body: Arc<Node>,
}

struct BranchOutcome {
    index: usize,
    result: Result<JsonValue, FailureEvent>,
    events: EventLog,
    /// Released only once the outcome has been recorded, so a failure is
    /// always seen before its slot can admit another branch.
    permit: BranchPermit,
}

/// Results gathered while branches settle, indexed by item.
struct Settled {
    outputs: Vec<Option<JsonValue>>,
    logs: Vec<Option<EventLog>>,
    pending: BTreeSet<usize>,
}

impl MapState {
    pub fn new(name: impl Into<String>, body: Node) -> Self {
        Self {
            name: name.into(),
            items_path: None,
            max_concurrency: None,
            body: Arc::new(body),
        }
    }

    pub fn with_items_path(mut self, path: &str) -> Result<Self, DefinitionError> {
        self.items_path = Some(InputPath::parse(path)?);
        Ok(self)
    }

    pub fn with_max_concurrency(mut self, limit: ConcurrencyLimit) -> Self {
        self.max_concurrency = Some(limit);
        self
    }

    pub(crate) async fn eval(&self, env: &mut Environment) -> Result<(), FailureEvent> {
        let input = env.peek()?.clone();
        env.record(
            HistoryEventType::MapStateEntered,
            json!({ "name": self.name, "input": input }),
        );

        let items = match &self.items_path {
            Some(path) => path.extract(&input)?,
            None => input,
        };
        let JsonValue::Array(items) = items else {
            return Err(FailureEvent::runtime(format!(
                "Map state '{}' expects an array of items, got '{}'",
                self.name,
                to_json_str(&items)
            )));
        };

        // Resolved against the state input still on top of the stack; a bad
        // limit fails the state before any branch exists.
        let limit = match &self.max_concurrency {
            Some(limit) => limit.resolve(env).await?,
            None => env.runtime().config.default_max_concurrency,
        };

        env.record(
            HistoryEventType::MapStateStarted,
            json!({ "length": items.len() }),
        );
        debug!(state = %self.name, items = items.len(), limit, "map fan-out starting");

        match self.run_branches(env, items, limit).await {
            Ok(outputs) => {
                env.record(HistoryEventType::MapStateSucceeded, json!({ "name": self.name }));
                env.push(JsonValue::Array(outputs));
                Ok(())
            }
            Err(failure) => {
                env.record(HistoryEventType::MapStateFailed, failure.details_json());
                Err(failure)
            }
        }
    }

    async fn run_branches(
        &self,
        env: &mut Environment,
        items: Vec<JsonValue>,
        limit: i64,
    ) -> Result<Vec<JsonValue>, FailureEvent> {
        let total = items.len();
        let slots = BranchSlots::new(limit);
        let mut branches: JoinSet<BranchOutcome> = JoinSet::new();
        let mut settled = Settled {
            outputs: vec![None; total],
            logs: (0..total).map(|_| None).collect(),
            pending: BTreeSet::new(),
        };
        let mut failure: Option<FailureEvent> = None;

        // Admission in index order; completions are handled while waiting
        // for a slot so the first failure stops admission promptly.
        'admit: for (index, item) in items.into_iter().enumerate() {
            let permit = loop {
                tokio::select! {
                    biased;
                    Some(joined) = branches.join_next(), if !branches.is_empty() => {
                        if let Err(f) = settled.record(joined) {
                            failure = Some(f);
                            break 'admit;
                        }
                    }
                    permit = slots.acquire() => break permit?,
                }
            };

            let child = env.child(index, item);
            settled.pending.insert(index);
            debug!(state = %self.name, index, "map branch admitted");
            branches.spawn(run_branch(
                self.name.clone(),
                index,
                child,
                Arc::clone(&self.body),
                permit,
            ));
        }

        if failure.is_none() {
            while let Some(joined) = branches.join_next().await {
                if let Err(f) = settled.record(joined) {
                    failure = Some(f);
                    break;
                }
            }
        }

        if failure.is_some() && !branches.is_empty() {
            warn!(
                state = %self.name,
                in_flight = branches.len(),
                "map branch failed; aborting in-flight branches"
            );
            branches.abort_all();
            while let Some(joined) = branches.join_next().await {
                // Late results are discarded; their history is kept.
                let _ = settled.record(joined);
            }
        }

        // Branch histories merge in index order so the log does not depend
        // on completion order.
        for (index, log) in settled.logs.into_iter().enumerate() {
            match log {
                Some(log) => env.merge_events(log),
                None if settled.pending.contains(&index) => env.record(
                    HistoryEventType::MapIterationAborted,
                    json!({ "name": self.name, "index": index }),
                ),
                None => {}
            }
        }

        if let Some(failure) = failure {
            return Err(failure);
        }
        settled
            .outputs
            .into_iter()
            .map(|o| {
                o.ok_or_else(|| FailureEvent::runtime("map branch finished without an output"))
            })
            .collect()
    }
}

impl Settled {
    fn record(&mut self, joined: Result<BranchOutcome, JoinError>) -> Result<(), FailureEvent> {
        let BranchOutcome {
            index,
            result,
            events,
            permit,
        } = match joined {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => return Ok(()),
            Err(e) => return Err(FailureEvent::runtime(format!("map branch panicked: {e}"))),
        };
        self.pending.remove(&index);
        self.logs[index] = Some(events);
        let recorded = match result {
            Ok(output) => {
                self.outputs[index] = Some(output);
                Ok(())
            }
            Err(failure) => Err(failure.with_index(index)),
        };
        drop(permit);
        recorded
    }
}

async fn run_branch(
    name: String,
    index: usize,
    mut env: Environment,
    body: Arc<Node>,
    permit: BranchPermit,
) -> BranchOutcome {
    env.record(
        HistoryEventType::MapIterationStarted,
        json!({ "name": name, "index": index }),
    );

    let result = match body.eval(&mut env).await {
        Ok(()) => env.pop(),
        Err(failure) => Err(failure),
    };

    match &result {
        Ok(_) => env.record(
            HistoryEventType::MapIterationSucceeded,
            json!({ "name": name, "index": index }),
        ),
        Err(failure) => env.record(
            HistoryEventType::MapIterationFailed,
            json!({
                "name": name,
                "index": index,
                "error": failure.error_name.as_str(),
                "cause": failure.cause(),
            }),
        ),
    }
    debug!(state = %name, index, ok = result.is_ok(), "map branch finished");

    BranchOutcome {
        index,
        result,
        events: env.into_events(),
        permit,
    }
}
