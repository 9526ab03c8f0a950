//! Engine configuration: runtime defaults and the per-service catalog of
//! accepted task parameters.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// `0` means no limit.
pub const DEFAULT_MAX_CONCURRENCY: i64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
    Auto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Used when a resource leaves its region empty.
    pub region: String,
    /// Used when a resource leaves its account empty.
    pub account: String,
    pub default_max_concurrency: i64,
    pub task_timeout_seconds: Option<u64>,
    pub services: ServiceCatalog,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            account: "000000000000".to_string(),
            default_max_concurrency: DEFAULT_MAX_CONCURRENCY,
            task_timeout_seconds: None,
            services: ServiceCatalog::builtin(),
        }
    }
}

impl EngineConfig {
    pub fn parse(input: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        match format {
            ConfigFormat::Json => Ok(serde_json::from_str(input)?),
            ConfigFormat::Yaml => Ok(serde_yaml::from_str(input)?),
            ConfigFormat::Auto => {
                // JSON always starts with `{` after trimming; anything else is YAML.
                if input.trim_start().starts_with('{') {
                    serde_json::from_str(input).or_else(|e| {
                        serde_yaml::from_str(input).map_err(|_| ConfigError::Json(e))
                    })
                } else {
                    Ok(serde_yaml::from_str(input)?)
                }
            }
        }
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_seconds.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Error name for client errors reported by this service's backend.
    /// Falls back to `<Service>.<ErrorCode>`.
    pub client_error_name: Option<String>,
    /// Lower-cased action name to the parameter names the action accepts.
    pub actions: BTreeMap<String, BTreeSet<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceCatalog {
    services: BTreeMap<String, ServiceConfig>,
}

impl ServiceCatalog {
    pub fn builtin() -> Self {
        let submit_job = [
            "ArrayProperties",
            "ContainerOverrides",
            "DependsOn",
            "JobDefinition",
            "JobName",
            "JobQueue",
            "Parameters",
            "RetryStrategy",
            "Timeout",
            "Tags",
        ];
        let batch = ServiceConfig {
            client_error_name: Some("Batch.ClientException".to_string()),
            actions: BTreeMap::from([(
                "submitjob".to_string(),
                submit_job.iter().map(|s| s.to_string()).collect(),
            )]),
        };
        Self {
            services: BTreeMap::from([("batch".to_string(), batch)]),
        }
    }

    pub fn insert(&mut self, service: impl Into<String>, config: ServiceConfig) {
        self.services.insert(service.into(), config);
    }

    pub fn service(&self, service: &str) -> Option<&ServiceConfig> {
        self.services.get(service)
    }

    /// Accepted parameter names, or `None` when the action is unrestricted.
    pub fn supported_parameters(&self, service: &str, action: &str) -> Option<&BTreeSet<String>> {
        self.services
            .get(service)?
            .actions
            .get(&action.to_ascii_lowercase())
    }

    pub fn client_error_name(&self, service: &str, error_code: &str) -> String {
        if let Some(name) = self.service(service).and_then(|s| s.client_error_name.as_ref()) {
            return name.clone();
        }
        let mut chars = service.chars();
        let service = match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => String::new(),
        };
        format!("{service}.{error_code}")
    }
}
