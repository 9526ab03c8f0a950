//! Task states: parameter normalisation, backend dispatch and failure
//! classification.

mod backend;
mod callback;
pub mod failure;

pub use backend::{BackendRegistry, ServiceClient, ServiceError, StaticBackendRegistry};
pub use callback::{CallbackChannel, CallbackError, CallbackOutcome, CallbackPool};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use asl_core::expressions::{to_json_str, PayloadTemplate};
use asl_core::{
    DefinitionError, FailureEvent, HistoryEventType, IntegrationPattern, Resource,
    ResourceRuntimePart, ServiceCatalog,
};
use serde_json::{json, Map, Value as JsonValue};
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::context::ExecutionContext;
use crate::env::Environment;
use crate::task::failure::{
    callback_failure, classify_callback_error, classify_service_error, timed_out,
};

/// Response keys that only describe the transport.
const RESPONSE_METADATA_KEY: &str = "ResponseMetadata";

#[derive(Debug)]
pub struct TaskState {
    pub name: String,
    pub resource: Resource,
    /// Payload template; the state input is sent as-is when absent.
    pub parameters: Option<PayloadTemplate>,
    /// Bounds dispatch and any callback wait. Falls back to the configured
    /// default task timeout.
    pub timeout: Option<Duration>,
}

impl TaskState {
    pub fn new(name: impl Into<String>, resource: &str) -> Result<Self, DefinitionError> {
        Ok(Self {
            name: name.into(),
            resource: Resource::parse(resource)?,
            parameters: None,
            timeout: None,
        })
    }

    pub fn with_parameters(mut self, parameters: &JsonValue) -> Result<Self, DefinitionError> {
        self.parameters = Some(PayloadTemplate::from_json(parameters)?);
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) async fn eval(&self, env: &mut Environment) -> Result<(), FailureEvent> {
        let input = env.peek()?.clone();
        env.record(
            HistoryEventType::TaskStateEntered,
            json!({ "name": self.name, "input": input }),
        );
        let runtime = Arc::clone(env.runtime());

        let token = match self.resource.pattern {
            IntegrationPattern::WaitForTaskToken => Some(Uuid::new_v4().to_string()),
            IntegrationPattern::RequestResponse => None,
        };
        if let Some(token) = &token {
            env.set_context("Task", json!({ "Token": token }));
        }
        let parameters = self.normalised_parameters(env, &input, &runtime.config.services);
        if token.is_some() {
            env.clear_context("Task");
        }
        let parameters = parameters?;

        let part = self
            .resource
            .runtime_part(&runtime.config.region, &runtime.config.account);
        let timeout = self.timeout.or_else(|| runtime.config.task_timeout());
        env.record(
            HistoryEventType::TaskScheduled,
            json!({
                "resource": self.resource.resource(),
                "resourceType": self.resource.resource_type(),
                "region": part.region,
                "parameters": to_json_str(&JsonValue::Object(parameters.clone())),
                "timeoutInSeconds": timeout.map(|t| t.as_secs()),
            }),
        );

        let deadline = timeout.map(|t| Instant::now() + t);
        match self
            .eval_service_task(env, &runtime, &part, parameters, token.as_deref(), deadline)
            .await
        {
            Ok(output) => {
                env.record(
                    HistoryEventType::TaskSucceeded,
                    json!({
                        "resource": self.resource.resource(),
                        "resourceType": self.resource.resource_type(),
                        "output": to_json_str(&output),
                    }),
                );
                env.push(output);
                Ok(())
            }
            Err(failure) => {
                env.record(failure.event_type, failure.details_json());
                Err(failure)
            }
        }
    }

    /// Evaluates the parameter template, then drops every field the target
    /// action does not accept.
    fn normalised_parameters(
        &self,
        env: &Environment,
        input: &JsonValue,
        catalog: &ServiceCatalog,
    ) -> Result<Map<String, JsonValue>, FailureEvent> {
        let value = match &self.parameters {
            Some(template) => template.evaluate(input, env.context_object(), env.variables())?,
            None => input.clone(),
        };
        let JsonValue::Object(mut parameters) = value else {
            return Err(FailureEvent::runtime(format!(
                "The parameters of task '{}' must be a JSON object, got '{}'",
                self.name,
                to_json_str(&value)
            )));
        };

        if let Some(supported) =
            catalog.supported_parameters(&self.resource.service_name, &self.resource.api_action)
        {
            parameters.retain(|key, _| supported.contains(key));
        }
        Ok(parameters)
    }

    async fn eval_service_task(
        &self,
        env: &mut Environment,
        runtime: &ExecutionContext,
        part: &ResourceRuntimePart,
        parameters: Map<String, JsonValue>,
        token: Option<&str>,
        deadline: Option<Instant>,
    ) -> Result<JsonValue, FailureEvent> {
        let catalog = &runtime.config.services;
        let client = runtime
            .backends
            .client_for(&part.region, &part.account, &self.resource.service_name)
            .map_err(|e| classify_service_error(catalog, &self.resource, &e))?;

        env.record(
            HistoryEventType::TaskStarted,
            json!({
                "resource": self.resource.resource(),
                "resourceType": self.resource.resource_type(),
            }),
        );

        let action = self.resource.normalized_action();
        debug!(
            state = %self.name,
            service = %self.resource.service_name,
            action = %action,
            "dispatching task"
        );
        // Discards the token however this call ends, including cancellation
        // of the branch running it.
        let _registration =
            token.map(|token| TokenRegistration::new(&*runtime.callbacks, token));

        let response = match within(deadline, client.invoke(&action, parameters)).await {
            Some(Ok(response)) => strip_response_metadata(response),
            Some(Err(e)) => {
                warn!(state = %self.name, error = %e, "backend call failed");
                return Err(classify_service_error(catalog, &self.resource, &e));
            }
            None => {
                warn!(state = %self.name, "backend call timed out");
                return Err(timed_out(&self.resource));
            }
        };

        let Some(token) = token else {
            return Ok(response);
        };

        env.record(
            HistoryEventType::TaskSubmitted,
            json!({
                "resource": self.resource.resource(),
                "resourceType": self.resource.resource_type(),
                "output": to_json_str(&response),
            }),
        );
        debug!(state = %self.name, token, "task suspended until its token completes");

        match within(deadline, runtime.callbacks.wait(token)).await {
            Some(Ok(CallbackOutcome::Success(output))) => Ok(output),
            Some(Ok(CallbackOutcome::Failure { error, cause })) => {
                Err(callback_failure(&self.resource, &error, &cause))
            }
            Some(Err(e)) => Err(classify_callback_error(&self.resource, &e)),
            None => Err(timed_out(&self.resource)),
        }
    }
}

/// A task token registered with the callback channel for as long as this
/// value lives.
struct TokenRegistration<'a> {
    callbacks: &'a dyn CallbackChannel,
    token: &'a str,
}

impl<'a> TokenRegistration<'a> {
    fn new(callbacks: &'a dyn CallbackChannel, token: &'a str) -> Self {
        callbacks.register(token);
        Self { callbacks, token }
    }
}

impl Drop for TokenRegistration<'_> {
    fn drop(&mut self) {
        self.callbacks.discard(self.token);
    }
}

fn strip_response_metadata(mut response: JsonValue) -> JsonValue {
    if let Some(obj) = response.as_object_mut() {
        obj.remove(RESPONSE_METADATA_KEY);
    }
    response
}

async fn within<F: Future>(deadline: Option<Instant>, fut: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut).await.ok(),
        None => Some(fut.await),
    }
}
