//! The evaluable node tree.

mod pass;

pub use pass::{FailState, PassState};

use asl_core::expressions::{InputPath, PayloadTemplate, VariableSample};
use asl_core::{DefinitionError, FailureEvent};
use futures_util::future::BoxFuture;
use serde_json::Value as JsonValue;

use crate::env::Environment;
use crate::fanout::{ConcurrencyLimit, MapState};
use crate::task::TaskState;

/// One element of a definition: a literal, an expression or a state.
///
/// Nodes are immutable once built and are shared read-only by concurrently
/// running Map branches.
#[derive(Debug)]
pub enum Node {
    Literal(JsonValue),
    /// JSONPath over the current input (`$...`) or the context object (`$$...`).
    Path(InputPath),
    Variable(VariableSample),
    Template(PayloadTemplate),
    Limit(ConcurrencyLimit),
    Pass(PassState),
    Fail(FailState),
    /// Runs each node on the previous node's output.
    Sequence(Vec<Node>),
    Task(TaskState),
    Map(MapState),
}

impl Node {
    pub fn literal(value: JsonValue) -> Self {
        Node::Literal(value)
    }

    pub fn path(path: &str) -> Result<Self, DefinitionError> {
        Ok(Node::Path(InputPath::parse(path)?))
    }

    pub fn variable(sample: &str) -> Result<Self, DefinitionError> {
        Ok(Node::Variable(VariableSample::parse(sample)?))
    }

    pub fn template(value: &JsonValue) -> Result<Self, DefinitionError> {
        Ok(Node::Template(PayloadTemplate::from_json(value)?))
    }

    /// Evaluates against `env`.
    ///
    /// On success exactly one value has been pushed. On failure the stack is
    /// restored to its depth on entry and the failure is returned.
    pub fn eval<'a>(&'a self, env: &'a mut Environment) -> BoxFuture<'a, Result<(), FailureEvent>> {
        Box::pin(async move {
            let depth = env.depth();
            let result = self.eval_body(env).await;
            match &result {
                Ok(()) => {
                    debug_assert_eq!(env.depth(), depth + 1, "node left the stack unbalanced")
                }
                Err(_) => env.truncate(depth),
            }
            result
        })
    }

    async fn eval_body(&self, env: &mut Environment) -> Result<(), FailureEvent> {
        match self {
            Node::Literal(value) => {
                env.push(value.clone());
                Ok(())
            }
            Node::Path(path) => {
                let value = path.evaluate(env.peek()?, env.context_object())?;
                env.push(value);
                Ok(())
            }
            Node::Variable(sample) => {
                let value = sample.sample(env.variables())?;
                env.push(value);
                Ok(())
            }
            Node::Template(template) => {
                let value = template.evaluate(env.peek()?, env.context_object(), env.variables())?;
                env.push(value);
                Ok(())
            }
            Node::Limit(limit) => limit.eval(env).await,
            Node::Pass(state) => state.eval(env),
            Node::Fail(state) => state.eval(env),
            Node::Sequence(nodes) => {
                let input = env.peek()?.clone();
                env.push(input);
                for node in nodes {
                    node.eval(env).await?;
                    let output = env.pop()?;
                    env.pop()?;
                    env.push(output);
                }
                Ok(())
            }
            Node::Task(state) => state.eval(env).await,
            Node::Map(state) => state.eval(env).await,
        }
    }
}

impl From<TaskState> for Node {
    fn from(value: TaskState) -> Self {
        Node::Task(value)
    }
}

impl From<MapState> for Node {
    fn from(value: MapState) -> Self {
        Node::Map(value)
    }
}

impl From<PassState> for Node {
    fn from(value: PassState) -> Self {
        Node::Pass(value)
    }
}

impl From<FailState> for Node {
    fn from(value: FailState) -> Self {
        Node::Fail(value)
    }
}
