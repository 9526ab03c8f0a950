mod common;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use asl_core::{EngineConfig, HistoryEventType, ServiceConfig};
use asl_exec::{CallbackPool, Environment, Node, ServiceError, TaskState};
use serde_json::{json, Value as JsonValue};

use common::{context_with_config, env_with, MockClient};

const SUBMIT_JOB: &str = "arn:aws:states:::batch:submitJob";
const SUBMIT_JOB_CALLBACK: &str = "arn:aws:states:::batch:submitJob.waitForTaskToken";

fn env_with_pool(
    config: EngineConfig,
    client: Arc<MockClient>,
    pool: Arc<CallbackPool>,
    input: JsonValue,
) -> Environment {
    Environment::new(
        Arc::new(context_with_config(config, "batch", client, pool)),
        input,
    )
}

#[tokio::test]
async fn unsupported_parameters_are_dropped_before_dispatch() {
    let mock = Arc::new(MockClient::new(|_, _| Ok(json!({ "JobId": "job-1" }))));
    let mut env = env_with("batch", mock.clone(), json!({ "JobName": "x", "Extra": "y" }));

    Node::from(TaskState::new("Submit", SUBMIT_JOB).unwrap())
        .eval(&mut env)
        .await
        .unwrap();

    assert_eq!(env.pop().unwrap(), json!({ "JobId": "job-1" }));
    let calls = mock.calls();
    assert_eq!(calls.len(), 1);
    let (action, params) = &calls[0];
    assert_eq!(action, "submit_job");
    assert_eq!(JsonValue::Object(params.clone()), json!({ "JobName": "x" }));
    assert_eq!(
        env.events().event_types(),
        vec![
            HistoryEventType::TaskStateEntered,
            HistoryEventType::TaskScheduled,
            HistoryEventType::TaskStarted,
            HistoryEventType::TaskSucceeded,
        ]
    );
}

#[tokio::test]
async fn parameter_template_is_evaluated_then_filtered() {
    let mock = Arc::new(MockClient::echo());
    let mut env = env_with("batch", mock.clone(), json!({ "name": "nightly", "queue": "q1" }));
    let task = TaskState::new("Submit", SUBMIT_JOB)
        .unwrap()
        .with_parameters(&json!({
            "JobName.$": "$.name",
            "JobQueue.$": "$.queue",
            "Comment": "not a batch parameter",
        }))
        .unwrap();

    Node::from(task).eval(&mut env).await.unwrap();

    assert_eq!(
        env.pop().unwrap(),
        json!({ "JobName": "nightly", "JobQueue": "q1" })
    );
}

#[tokio::test]
async fn client_error_carries_backend_message_as_cause() {
    let mock = Arc::new(MockClient::new(|_, _| {
        Err(ServiceError::client("ClientException", "boom"))
    }));
    let mut env = env_with("batch", mock.clone(), json!({ "JobName": "x" }));

    let err = Node::from(TaskState::new("Submit", SUBMIT_JOB).unwrap())
        .eval(&mut env)
        .await
        .unwrap_err();

    assert_eq!(err.error_name.as_str(), "Batch.ClientException");
    assert_eq!(err.cause(), Some("boom"));
    assert_eq!(err.event_type, HistoryEventType::TaskFailed);
    assert_eq!(err.details.resource.as_deref(), Some("submitJob"));
    assert_eq!(err.details.resource_type.as_deref(), Some("batch"));
    assert_eq!(env.depth(), 1);

    let last = env.events().iter().last().unwrap();
    assert_eq!(last.event_type, HistoryEventType::TaskFailed);
    assert_eq!(last.details["cause"], json!("boom"));
    assert_eq!(last.details["resourceType"], json!("batch"));
}

#[tokio::test]
async fn other_backend_errors_become_task_failed() {
    let mock = Arc::new(MockClient::new(|_, _| {
        Err(ServiceError::Other("socket closed".to_string()))
    }));
    let mut env = env_with("batch", mock, json!({}));

    let err = Node::from(TaskState::new("Submit", SUBMIT_JOB).unwrap())
        .eval(&mut env)
        .await
        .unwrap_err();

    assert_eq!(err.error_name.as_str(), "States.TaskFailed");
    assert_eq!(err.cause(), Some("socket closed"));
    assert_eq!(err.event_type, HistoryEventType::TaskFailed);
}

#[tokio::test]
async fn missing_backend_fails_without_dispatch() {
    let mock = Arc::new(MockClient::echo());
    let mut env = env_with("sqs", mock.clone(), json!({}));

    let err = Node::from(TaskState::new("Submit", SUBMIT_JOB).unwrap())
        .eval(&mut env)
        .await
        .unwrap_err();

    assert_eq!(err.error_name.as_str(), "States.TaskFailed");
    assert!(err.cause().unwrap().contains("batch"));
    assert!(err.cause().unwrap().contains("us-east-1"));
    assert_eq!(mock.call_count(), 0);
    assert!(!env
        .events()
        .event_types()
        .contains(&HistoryEventType::TaskStarted));
}

#[tokio::test]
async fn response_metadata_is_stripped() {
    let mock = Arc::new(MockClient::new(|_, _| {
        Ok(json!({ "JobId": "j", "ResponseMetadata": { "RequestId": "r" } }))
    }));
    let mut env = env_with("batch", mock, json!({}));

    Node::from(TaskState::new("Submit", SUBMIT_JOB).unwrap())
        .eval(&mut env)
        .await
        .unwrap();

    assert_eq!(env.pop().unwrap(), json!({ "JobId": "j" }));
}

#[tokio::test]
async fn non_object_parameters_fail_before_dispatch() {
    let mock = Arc::new(MockClient::echo());
    let mut env = env_with("batch", mock.clone(), json!([1, 2]));

    let err = Node::from(TaskState::new("Submit", SUBMIT_JOB).unwrap())
        .eval(&mut env)
        .await
        .unwrap_err();

    assert_eq!(err.error_name.as_str(), "States.Runtime");
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn configured_catalog_controls_filtering_and_error_names() {
    let mut config = EngineConfig::default();
    config.services.insert(
        "mock",
        ServiceConfig {
            client_error_name: Some("Mock.Rejected".to_string()),
            actions: BTreeMap::from([(
                "putitem".to_string(),
                BTreeSet::from(["Item".to_string()]),
            )]),
        },
    );
    let mock = Arc::new(MockClient::echo());
    let mut env = Environment::new(
        Arc::new(context_with_config(
            config.clone(),
            "mock",
            mock.clone(),
            Arc::new(CallbackPool::new()),
        )),
        json!({ "Item": 1, "Other": 2 }),
    );

    Node::from(TaskState::new("Put", "arn:aws:states:::mock:putItem").unwrap())
        .eval(&mut env)
        .await
        .unwrap();
    assert_eq!(env.pop().unwrap(), json!({ "Item": 1 }));
    assert_eq!(mock.calls()[0].0, "put_item");

    let failing = Arc::new(MockClient::new(|_, _| {
        Err(ServiceError::client("Throttled", "slow down"))
    }));
    let mut env = Environment::new(
        Arc::new(context_with_config(config, "mock", failing, Arc::new(CallbackPool::new()))),
        json!({}),
    );
    let err = Node::from(TaskState::new("Put", "arn:aws:states:::mock:putItem").unwrap())
        .eval(&mut env)
        .await
        .unwrap_err();
    assert_eq!(err.error_name.as_str(), "Mock.Rejected");
}

#[tokio::test(start_paused = true)]
async fn slow_backend_times_out() {
    let mock = Arc::new(MockClient::echo().with_delay(Duration::from_secs(10)));
    let mut env = env_with("batch", mock, json!({}));
    let task = TaskState::new("Submit", SUBMIT_JOB)
        .unwrap()
        .with_timeout(Duration::from_secs(1));

    let err = Node::from(task).eval(&mut env).await.unwrap_err();

    assert_eq!(err.error_name.as_str(), "States.Timeout");
    assert_eq!(err.event_type, HistoryEventType::TaskTimedOut);
    assert_eq!(
        env.events().event_types().last(),
        Some(&HistoryEventType::TaskTimedOut)
    );
}

#[tokio::test(start_paused = true)]
async fn configured_default_timeout_applies() {
    let config = EngineConfig {
        task_timeout_seconds: Some(2),
        ..EngineConfig::default()
    };
    let mock = Arc::new(MockClient::echo().with_delay(Duration::from_secs(5)));
    let mut env = env_with_pool(config, mock, Arc::new(CallbackPool::new()), json!({}));

    let err = Node::from(TaskState::new("Submit", SUBMIT_JOB).unwrap())
        .eval(&mut env)
        .await
        .unwrap_err();

    assert_eq!(err.error_name.as_str(), "States.Timeout");
}

#[tokio::test]
async fn callback_task_waits_for_token_success() {
    let pool = Arc::new(CallbackPool::new());
    let completer = Arc::clone(&pool);
    let mock = Arc::new(MockClient::new(move |_, params| {
        let token = params["Parameters"]["token"].as_str().unwrap_or_default().to_string();
        completer.send_success(&token, json!({ "done": true })).unwrap();
        Ok(json!({ "JobId": "j" }))
    }));
    let mut env = env_with_pool(EngineConfig::default(), mock.clone(), pool.clone(), json!({}));
    let task = TaskState::new("Submit", SUBMIT_JOB_CALLBACK)
        .unwrap()
        .with_parameters(&json!({ "JobName": "cb", "Parameters": { "token.$": "$$.Task.Token" } }))
        .unwrap();

    Node::from(task).eval(&mut env).await.unwrap();

    assert_eq!(env.pop().unwrap(), json!({ "done": true }));
    assert!(pool.pending_tokens().is_empty());
    assert_eq!(
        env.events().event_types(),
        vec![
            HistoryEventType::TaskStateEntered,
            HistoryEventType::TaskScheduled,
            HistoryEventType::TaskStarted,
            HistoryEventType::TaskSubmitted,
            HistoryEventType::TaskSucceeded,
        ]
    );
    let scheduled = env.events().iter().nth(1).unwrap();
    assert_eq!(scheduled.details["resource"], json!("submitJob.waitForTaskToken"));
}

#[tokio::test]
async fn callback_task_fails_with_reported_error() {
    let pool = Arc::new(CallbackPool::new());
    let mock = Arc::new(MockClient::echo());
    let mut env = env_with_pool(
        EngineConfig::default(),
        mock,
        pool.clone(),
        json!({ "JobName": "cb" }),
    );

    let completer = tokio::spawn({
        let pool = Arc::clone(&pool);
        async move {
            loop {
                if let Some(token) = pool.pending_tokens().into_iter().next() {
                    pool.send_failure(&token, "Job.Failed", "exploded").unwrap();
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        }
    });

    let err = Node::from(TaskState::new("Submit", SUBMIT_JOB_CALLBACK).unwrap())
        .eval(&mut env)
        .await
        .unwrap_err();
    completer.await.unwrap();

    assert_eq!(err.error_name.as_str(), "Job.Failed");
    assert_eq!(err.cause(), Some("exploded"));
    assert_eq!(err.event_type, HistoryEventType::TaskFailed);
    assert_eq!(err.details.resource.as_deref(), Some("submitJob.waitForTaskToken"));
}

#[tokio::test(start_paused = true)]
async fn callback_wait_is_bounded_by_timeout() {
    let pool = Arc::new(CallbackPool::new());
    let mock = Arc::new(MockClient::echo());
    let mut env = env_with_pool(EngineConfig::default(), mock, pool.clone(), json!({}));
    let task = TaskState::new("Submit", SUBMIT_JOB_CALLBACK)
        .unwrap()
        .with_timeout(Duration::from_secs(30));

    let err = Node::from(task).eval(&mut env).await.unwrap_err();

    assert_eq!(err.error_name.as_str(), "States.Timeout");
    assert!(pool.pending_tokens().is_empty());
}

#[tokio::test]
async fn token_is_not_visible_outside_the_task() {
    let mock = Arc::new(MockClient::echo());
    let mut env = env_with("batch", mock, json!({}));
    Node::from(TaskState::new("Submit", SUBMIT_JOB).unwrap())
        .eval(&mut env)
        .await
        .unwrap();
    assert!(env.context_object().get("Task").is_none());
}
