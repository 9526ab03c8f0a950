#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use asl_core::EngineConfig;
use asl_exec::{
    CallbackPool, Environment, ExecutionContext, ServiceClient, ServiceError, StaticBackendRegistry,
};
use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

type Responder =
    dyn Fn(&str, &Map<String, JsonValue>) -> Result<JsonValue, ServiceError> + Send + Sync;

/// Records every call and tracks how many calls overlap. A numeric `Delay`
/// parameter (milliseconds) overrides the default delay.
pub struct MockClient {
    calls: Mutex<Vec<(String, Map<String, JsonValue>)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
    respond: Box<Responder>,
}

impl MockClient {
    pub fn echo() -> Self {
        Self::new(|_, params| Ok(JsonValue::Object(params.clone())))
    }

    pub fn new(
        respond: impl Fn(&str, &Map<String, JsonValue>) -> Result<JsonValue, ServiceError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay: Duration::ZERO,
            respond: Box::new(respond),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<(String, Map<String, JsonValue>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceClient for MockClient {
    async fn invoke(
        &self,
        action: &str,
        parameters: Map<String, JsonValue>,
    ) -> Result<JsonValue, ServiceError> {
        self.calls
            .lock()
            .unwrap()
            .push((action.to_string(), parameters.clone()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = parameters
            .get("Delay")
            .and_then(|d| d.as_u64())
            .map(Duration::from_millis)
            .unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.respond)(action, &parameters)
    }
}

pub fn context_with(service: &str, client: Arc<dyn ServiceClient>) -> ExecutionContext {
    context_with_config(EngineConfig::default(), service, client, Arc::new(CallbackPool::new()))
}

pub fn context_with_config(
    config: EngineConfig,
    service: &str,
    client: Arc<dyn ServiceClient>,
    callbacks: Arc<CallbackPool>,
) -> ExecutionContext {
    ExecutionContext::new(
        config,
        Arc::new(StaticBackendRegistry::new().with(service, client)),
        callbacks,
    )
}

pub fn env_with(service: &str, client: Arc<dyn ServiceClient>, input: JsonValue) -> Environment {
    Environment::new(Arc::new(context_with(service, client)), input)
}

pub fn bare_env(input: JsonValue) -> Environment {
    env_with("mock", Arc::new(MockClient::echo()), input)
}
