//! Procedure invocation through the full HTTP stack.

use serde_json::{Value, json};
use spapi::auth;

use super::*;

async fn call(harness: &Harness, headers: &[(&str, &str)], request: Value) -> String {
    raw_request(
        harness.addr(),
        &post("/api/data", headers, &request.to_string()),
    )
    .await
}

fn json_body(response: &str) -> Value {
    serde_json::from_str(body(response))
        .unwrap_or_else(|e| panic!("body is not JSON ({e}):\n{response}"))
}

fn bearer(subject: &str, extra: Value) -> String {
    let config = Auth {
        jwt_secret: SECRET.to_string(),
        token_expiry_days: 1,
    };
    let Value::Object(extra) = extra else {
        panic!("extra claims must be an object");
    };
    format!("Bearer {}", auth::create_token(&config, subject, extra).unwrap())
}

#[tokio::test]
async fn response_shape_follows_context() {
    let harness = start(plain_http()).await;
    expose(
        &harness.db,
        "GetUsers",
        &[
            "SELECT id, name FROM users ORDER BY id",
            "SELECT COUNT(*) AS total FROM users",
        ],
        None,
    )
    .await;

    let rows = call(&harness, &[], json!({"object": "GetUsers"})).await;
    let unknown = call(&harness, &[], json!({"object": "GetUsers", "context": "bogus"})).await;
    let multiple = call(&harness, &[], json!({"object": "GetUsers", "context": "MULTIPLE"})).await;
    let record = call(&harness, &[], json!({"object": "GetUsers", "context": "record"})).await;
    let scalar = call(&harness, &[], json!({"object": "GetUsers", "context": "scalar"})).await;
    harness.shutdown().await;

    let users = json!([{"id": 1, "name": "ada"}, {"id": 2, "name": "bob"}]);
    assert_eq!(status(&rows), 200);
    assert_eq!(header(&rows, "content-type"), Some("application/json"));
    assert_eq!(json_body(&rows), users);
    assert_eq!(json_body(&unknown), users);
    assert_eq!(json_body(&multiple), json!([users, [{"total": 2}]]));
    assert_eq!(json_body(&record), json!({"id": 1, "name": "ada"}));
    assert_eq!(json_body(&scalar), json!(1));
}

#[tokio::test]
async fn empty_results_are_null_or_empty() {
    let harness = start(plain_http()).await;
    expose(&harness.db, "Nobody", &["SELECT id FROM users WHERE id < 0"], None).await;

    let rows = call(&harness, &[], json!({"object": "Nobody"})).await;
    let record = call(&harness, &[], json!({"object": "Nobody", "context": "record"})).await;
    let scalar = call(&harness, &[], json!({"object": "Nobody", "context": "scalar"})).await;
    harness.shutdown().await;

    assert_eq!(body(&rows), "[]");
    assert_eq!(body(&record), "null");
    assert_eq!(body(&scalar), "null");
}

#[tokio::test]
async fn procedure_without_result_set() {
    let harness = start(plain_http()).await;
    expose(
        &harness.db,
        "AddUser",
        &["INSERT INTO users (id, name) VALUES (:id, :name)"],
        None,
    )
    .await;
    expose(&harness.db, "CountUsers", &["SELECT COUNT(*) FROM users"], None).await;

    let rows = call(&harness, &[], json!({"object": "AddUser", "parameters": {"id": 3, "name": "cy"}})).await;
    let multiple = call(
        &harness,
        &[],
        json!({"object": "AddUser", "context": "multiple", "parameters": {"id": 4, "name": "di"}}),
    )
    .await;
    let count = call(&harness, &[], json!({"object": "CountUsers", "context": "scalar"})).await;
    harness.shutdown().await;

    assert_eq!(status(&rows), 200);
    assert_eq!(body(&rows), "[]");
    assert_eq!(body(&multiple), "[]");
    assert_eq!(body(&count), "4");
}

#[tokio::test]
async fn parameters_are_coerced() {
    let harness = start(plain_http()).await;
    expose(
        &harness.db,
        "Echo",
        &["SELECT typeof(:whole) AS whole, :whole AS whole_value, typeof(:ratio) AS ratio, :ratio AS ratio_value, :ratio < 5.0 AS ratio_below, :label AS label, :missing AS missing"],
        None,
    )
    .await;

    let response = call(
        &harness,
        &[],
        json!({
            "object": "Echo",
            "context": "record",
            "parameters": {"whole": 42, "ratio": 0.25, "label": "hi"}
        }),
    )
    .await;
    harness.shutdown().await;

    assert_eq!(
        json_body(&response),
        json!({
            "whole": "integer",
            "whole_value": 42,
            "ratio": "real",
            "ratio_value": 0.25,
            "ratio_below": 1,
            "label": "\"hi\"",
            "missing": null
        })
    );
}

#[tokio::test]
async fn pascal_case_body_is_accepted() {
    let harness = start(plain_http()).await;
    expose(&harness.db, "Find", &["SELECT name FROM users WHERE id = @id"], None).await;

    let response = call(
        &harness,
        &[],
        json!({"Schema": "DBO", "Object": "find", "Context": "scalar", "Parameters": {"id": 2}}),
    )
    .await;
    harness.shutdown().await;

    assert_eq!(status(&response), 200);
    assert_eq!(body(&response), r#""bob""#);
}

#[tokio::test]
async fn authenticated_caller_reaches_procedure() {
    let harness = start(plain_http()).await;
    expose(
        &harness.db,
        "WhoAmI",
        &["SELECT :_user AS caller, json_extract(:_claims, '$[0].Key') AS first_claim"],
        None,
    )
    .await;
    let token = bearer("u-42", json!({"name": "alice", "role": "admin"}));

    let response = call(
        &harness,
        &[("Authorization", token.as_str())],
        json!({
            "object": "WhoAmI",
            "context": "record",
            "parameters": {"_user": "mallory"},
            "user": "mallory"
        }),
    )
    .await;
    harness.shutdown().await;

    assert_eq!(
        json_body(&response),
        json!({"caller": "alice", "first_claim": "sub"})
    );
}

#[tokio::test]
async fn invalid_token_is_anonymous() {
    let harness = start(plain_http()).await;
    expose(
        &harness.db,
        "WhoAmI",
        &["SELECT :_user AS caller, :_claims AS claims"],
        None,
    )
    .await;

    let response = call(
        &harness,
        &[("Authorization", "Bearer not-a-token")],
        json!({"object": "WhoAmI", "context": "record"}),
    )
    .await;
    harness.shutdown().await;

    assert_eq!(status(&response), 200);
    assert_eq!(json_body(&response), json!({"caller": null, "claims": "[]"}));
}

#[tokio::test]
async fn command_timeout_zero_is_unbounded_and_negative_is_rejected() {
    let harness = start(plain_http()).await;
    expose(&harness.db, "CountUsers", &["SELECT COUNT(*) FROM users"], None).await;

    let unbounded = call(
        &harness,
        &[],
        json!({"object": "CountUsers", "context": "scalar", "commandTimeout": 0}),
    )
    .await;
    let negative = call(
        &harness,
        &[],
        json!({"object": "CountUsers", "context": "scalar", "commandTimeout": -1}),
    )
    .await;
    harness.shutdown().await;

    assert_eq!(body(&unbounded), "2");
    assert_eq!(status(&negative), 500);
    assert_eq!(body(&negative), "Application Error");
}

#[tokio::test]
async fn expired_command_timeout_is_application_error() {
    let harness = start(plain_http()).await;
    expose(
        &harness.db,
        "Spin",
        &["WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 200000000) SELECT MAX(x) FROM c"],
        None,
    )
    .await;

    let started = std::time::Instant::now();
    let response = call(&harness, &[], json!({"object": "Spin", "commandTimeout": 1})).await;
    let elapsed = started.elapsed();
    harness.shutdown().await;

    assert_eq!(status(&response), 500);
    assert_eq!(body(&response), "Application Error");
    assert!(elapsed < std::time::Duration::from_secs(5), "took {elapsed:?}");
}
