use asl_core::{
    ErrorName, FailureEvent, HistoryEventType, Resource, ServiceCatalog, StatesErrorName,
};

use crate::task::backend::ServiceError;
use crate::task::callback::CallbackError;

/// Classifies a backend error for the task that dispatched `resource`.
///
/// Client errors carry the backend's own message as the cause under the
/// service's configured error name. Anything else falls back to
/// `States.TaskFailed` with the error's rendering as the cause.
pub fn classify_service_error(
    catalog: &ServiceCatalog,
    resource: &Resource,
    err: &ServiceError,
) -> FailureEvent {
    match err {
        ServiceError::Client { code, message } => FailureEvent::new(
            ErrorName::Custom(catalog.client_error_name(&resource.service_name, code)),
            HistoryEventType::TaskFailed,
            message.clone(),
        )
        .with_resource(resource.resource(), resource.resource_type()),
        other => task_failed(resource, other.to_string()),
    }
}

pub fn classify_callback_error(resource: &Resource, err: &CallbackError) -> FailureEvent {
    task_failed(resource, err.to_string())
}

/// A failure reported through `send_failure` on a task token.
pub fn callback_failure(resource: &Resource, error: &str, cause: &str) -> FailureEvent {
    FailureEvent::new(ErrorName::custom(error), HistoryEventType::TaskFailed, cause)
        .with_resource(resource.resource(), resource.resource_type())
}

pub fn timed_out(resource: &Resource) -> FailureEvent {
    FailureEvent::new(
        StatesErrorName::Timeout,
        HistoryEventType::TaskTimedOut,
        "The task did not complete before its timeout",
    )
    .with_resource(resource.resource(), resource.resource_type())
}

fn task_failed(resource: &Resource, cause: String) -> FailureEvent {
    FailureEvent::new(StatesErrorName::TaskFailed, HistoryEventType::TaskFailed, cause)
        .with_resource(resource.resource(), resource.resource_type())
}
