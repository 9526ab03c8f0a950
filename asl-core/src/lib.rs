#![forbid(unsafe_code)]

//! Definition-side model for the states-language interpreter.
//!
//! Nothing in this crate evaluates anything: it holds the immutable pieces a
//! parsed state machine is built from, and the failure taxonomy the runtime
//! raises. Evaluation lives in `asl-exec`.

pub mod config;
pub mod error;
pub mod expressions;
pub mod failure;
pub mod resource;

pub use crate::config::{ConfigFormat, EngineConfig, ServiceCatalog, ServiceConfig};
pub use crate::error::{ConfigError, DefinitionError};
pub use crate::expressions::{InputPath, PayloadTemplate, VariableSample};
pub use crate::failure::{
    ErrorName, FailureDetails, FailureEvent, HistoryEventType, StatesErrorName,
};
pub use crate::resource::{IntegrationPattern, Resource, ResourceRuntimePart};
