use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
    /// The backend rejected the call with its own error code and message.
    #[error("{code}: {message}")]
    Client { code: String, message: String },
    #[error("no backend for service '{service}' in {region}/{account}")]
    Unavailable {
        region: String,
        account: String,
        service: String,
    },
    #[error("{0}")]
    Other(String),
}

impl ServiceError {
    pub fn client(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Client {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// One backend service. `action` is already in the backend's invocation
/// style (`submit_job`), and `parameters` are already filtered.
#[async_trait]
pub trait ServiceClient: Send + Sync {
    async fn invoke(
        &self,
        action: &str,
        parameters: Map<String, JsonValue>,
    ) -> Result<JsonValue, ServiceError>;
}

/// Resolves the client for a (region, account, service) triple.
pub trait BackendRegistry: Send + Sync {
    fn client_for(
        &self,
        region: &str,
        account: &str,
        service: &str,
    ) -> Result<Arc<dyn ServiceClient>, ServiceError>;
}

/// Registry keyed by service name alone; region and account are ignored.
#[derive(Default)]
pub struct StaticBackendRegistry {
    clients: HashMap<String, Arc<dyn ServiceClient>>,
}

impl StaticBackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, service: impl Into<String>, client: Arc<dyn ServiceClient>) {
        self.clients.insert(service.into(), client);
    }

    pub fn with(mut self, service: impl Into<String>, client: Arc<dyn ServiceClient>) -> Self {
        self.register(service, client);
        self
    }
}

impl BackendRegistry for StaticBackendRegistry {
    fn client_for(
        &self,
        region: &str,
        account: &str,
        service: &str,
    ) -> Result<Arc<dyn ServiceClient>, ServiceError> {
        self.clients
            .get(service)
            .cloned()
            .ok_or_else(|| ServiceError::Unavailable {
                region: region.to_string(),
                account: account.to_string(),
                service: service.to_string(),
            })
    }
}
