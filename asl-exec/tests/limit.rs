mod common;

use asl_exec::{ConcurrencyLimit, Node};
use serde_json::json;

use common::bare_env;

#[tokio::test]
async fn literal_defaults_to_unlimited() {
    let mut env = bare_env(json!({}));
    ConcurrencyLimit::default().eval(&mut env).await.unwrap();
    assert_eq!(env.pop().unwrap(), json!(0));
}

#[tokio::test]
async fn limit_node_pushes_resolved_value() {
    let mut env = bare_env(json!({"n": 5}));
    Node::Limit(ConcurrencyLimit::path("$.n").unwrap())
        .eval(&mut env)
        .await
        .unwrap();
    assert_eq!(env.depth(), 2);
    assert_eq!(env.pop().unwrap(), json!(5));
    assert_eq!(env.peek().unwrap(), &json!({"n": 5}));
}

#[tokio::test]
async fn expression_result_is_coerced_without_validation() {
    let mut env = bare_env(json!({"n": "4"}));
    ConcurrencyLimit::expression(Node::path("$.n").unwrap())
        .eval(&mut env)
        .await
        .unwrap();
    assert_eq!(env.pop().unwrap(), json!(4));

    let mut env = bare_env(json!({}));
    ConcurrencyLimit::expression(Node::literal(json!(-2)))
        .eval(&mut env)
        .await
        .unwrap();
    assert_eq!(env.pop().unwrap(), json!(-2));

    let mut env = bare_env(json!({}));
    ConcurrencyLimit::expression(Node::literal(json!(3.7)))
        .eval(&mut env)
        .await
        .unwrap();
    assert_eq!(env.pop().unwrap(), json!(3));
}

#[tokio::test]
async fn expression_without_integer_reading_fails() {
    let mut env = bare_env(json!({}));
    let err = ConcurrencyLimit::expression(Node::literal(json!("many")))
        .eval(&mut env)
        .await
        .unwrap_err();
    assert_eq!(err.error_name.as_str(), "States.Runtime");
    assert_eq!(env.depth(), 1);
}

#[tokio::test]
async fn variable_is_coerced_without_validation() {
    let mut env = bare_env(json!({}));
    env.bind("max", json!(-1));
    ConcurrencyLimit::variable("$max").unwrap().eval(&mut env).await.unwrap();
    assert_eq!(env.pop().unwrap(), json!(-1));
}

#[tokio::test]
async fn path_rejects_string_value_naming_value_and_path() {
    let mut env = bare_env(json!({"concurrency": "five"}));
    let err = ConcurrencyLimit::path("$.concurrency")
        .unwrap()
        .eval(&mut env)
        .await
        .unwrap_err();
    assert_eq!(err.error_name.as_str(), "States.Runtime");
    assert_eq!(
        err.cause(),
        Some("The MaxConcurrencyPath field refers to value \"five\" which is not a valid integer: $.concurrency")
    );
}

#[tokio::test]
async fn path_renders_non_string_values_as_json() {
    let mut env = bare_env(json!({"concurrency": {"max": 2}}));
    let err = ConcurrencyLimit::path("$.concurrency")
        .unwrap()
        .eval(&mut env)
        .await
        .unwrap_err();
    let cause = err.cause().unwrap();
    assert!(cause.contains(r#"{"max":2}"#));
    assert!(cause.contains("$.concurrency"));

    let mut env = bare_env(json!({"concurrency": 2.5}));
    let err = ConcurrencyLimit::path("$.concurrency")
        .unwrap()
        .eval(&mut env)
        .await
        .unwrap_err();
    assert!(err.cause().unwrap().contains("2.5"));
}

#[tokio::test]
async fn path_rejects_negative_integer() {
    let mut env = bare_env(json!({"concurrency": -3}));
    let err = ConcurrencyLimit::path("$.concurrency")
        .unwrap()
        .eval(&mut env)
        .await
        .unwrap_err();
    assert_eq!(err.error_name.as_str(), "States.Runtime");
    assert_eq!(
        err.cause(),
        Some("Expected non-negative integer for MaxConcurrency, got '-3' instead.")
    );
    assert_eq!(err.event_type.as_str(), "ExecutionFailed");
}

#[tokio::test]
async fn path_accepts_zero() {
    let mut env = bare_env(json!({"concurrency": 0}));
    ConcurrencyLimit::path("$.concurrency")
        .unwrap()
        .eval(&mut env)
        .await
        .unwrap();
    assert_eq!(env.pop().unwrap(), json!(0));
}

#[tokio::test]
async fn path_reads_booleans_as_zero_or_one() {
    for (value, expected) in [(json!(true), 1), (json!(false), 0)] {
        let mut env = bare_env(json!({ "concurrency": value }));
        ConcurrencyLimit::path("$.concurrency")
            .unwrap()
            .eval(&mut env)
            .await
            .unwrap();
        assert_eq!(env.pop().unwrap(), json!(expected));
    }
}
