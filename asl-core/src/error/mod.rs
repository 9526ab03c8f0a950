use thiserror::Error;

/// Raised while building a definition tree. Never raised during evaluation.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("invalid JSONPath '{path}': {message}")]
    InvalidPath { path: String, message: String },
    #[error("invalid variable reference '{0}'")]
    InvalidVariable(String),
    #[error("invalid resource '{0}'")]
    InvalidResource(String),
    #[error("unsupported integration pattern '{pattern}' in resource '{resource}'")]
    UnsupportedPattern { resource: String, pattern: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to parse as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
