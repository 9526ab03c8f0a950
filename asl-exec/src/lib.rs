#![forbid(unsafe_code)]

//! Interpreter for parsed states-language definitions.
//!
//! A definition is a tree of [`Node`]s evaluated against an [`Environment`].
//! Every node pushes exactly one value on success or returns a
//! [`FailureEvent`](asl_core::FailureEvent); Map states fan out over child
//! environments under a concurrency limit, and Task states dispatch to
//! backends resolved through a [`BackendRegistry`].

pub mod context;
pub mod env;
pub mod execution;
pub mod fanout;
pub mod history;
pub mod node;
pub mod task;

pub use crate::context::ExecutionContext;
pub use crate::env::Environment;
pub use crate::execution::{Execution, ExecutionOutcome, ExecutionStatus};
pub use crate::fanout::{BranchSlots, ConcurrencyLimit, MapState};
pub use crate::history::{
    CompositeHistorySink, EventLog, HistoryEntry, HistoryEvent, HistorySink, MemoryHistorySink,
    NoOpHistorySink, StdoutHistorySink,
};
pub use crate::node::{FailState, Node, PassState};
pub use crate::task::{
    BackendRegistry, CallbackChannel, CallbackError, CallbackOutcome, CallbackPool, ServiceClient,
    ServiceError, StaticBackendRegistry, TaskState,
};
