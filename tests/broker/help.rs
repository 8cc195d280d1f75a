//! Help requests and the help key gate.

use super::*;

const HELP: &str = r#"{"object":"GetUsers","context":"help"}"#;

async fn with_help(enable_help: bool, help_key: Option<&str>) -> Harness {
    let harness = start(cfg::Broker {
        enable_help,
        help_key: help_key.map(str::to_string),
        ..plain_http()
    })
    .await;
    expose(
        &harness.db,
        "GetUsers",
        &["SELECT id FROM users ORDER BY id"],
        Some("Lists every user. No parameters."),
    )
    .await;
    harness
}

#[tokio::test]
async fn help_returns_plain_text_documentation() {
    let harness = with_help(true, None).await;

    let response = raw_request(harness.addr(), &post("/api/data", &[], HELP)).await;
    harness.shutdown().await;

    assert_eq!(status(&response), 200);
    assert_eq!(header(&response, "content-type"), Some("text/plain"));
    assert_eq!(body(&response), "Lists every user. No parameters.");
}

#[tokio::test]
async fn help_without_text_reports_not_found() {
    let harness = with_help(true, None).await;
    expose(&harness.db, "Undocumented", &["SELECT 1"], None).await;

    let response = raw_request(
        harness.addr(),
        &post("/api/data", &[], r#"{"object":"Undocumented","context":"HELP"}"#),
    )
    .await;
    harness.shutdown().await;

    assert_eq!(status(&response), 200);
    assert_eq!(body(&response), "not found");
}

#[tokio::test]
async fn help_key_gates_documentation() {
    let harness = with_help(true, Some("open-sesame")).await;

    let keyed = raw_request(
        harness.addr(),
        &post("/api/data", &[("X-Spapi-Key", "open-sesame")], HELP),
    )
    .await;
    let wrong = raw_request(
        harness.addr(),
        &post("/api/data", &[("X-Spapi-Key", "Open-Sesame")], HELP),
    )
    .await;
    let missing = raw_request(harness.addr(), &post("/api/data", &[], HELP)).await;
    harness.shutdown().await;

    assert_eq!(body(&keyed), "Lists every user. No parameters.");
    // Without the key the request falls through to the procedure itself.
    assert_eq!(header(&wrong, "content-type"), Some("application/json"));
    assert_eq!(body(&wrong), r#"[{"id":1},{"id":2}]"#);
    assert_eq!(body(&missing), r#"[{"id":1},{"id":2}]"#);
}

#[tokio::test]
async fn disabled_help_invokes_procedure() {
    let harness = with_help(false, None).await;

    let response = raw_request(harness.addr(), &post("/api/data", &[], HELP)).await;
    harness.shutdown().await;

    assert_eq!(status(&response), 200);
    assert_eq!(body(&response), r#"[{"id":1},{"id":2}]"#);
}

#[tokio::test]
async fn help_for_untagged_object_is_not_exposed() {
    let harness = with_help(true, None).await;
    let conn = db::connection(&harness.db).unwrap();
    db::define_procedure(&conn, "dbo", "Internal", &["SELECT 1"]).await.unwrap();

    let response = raw_request(
        harness.addr(),
        &post("/api/data", &[], r#"{"object":"Internal","context":"help"}"#),
    )
    .await;
    harness.shutdown().await;

    assert_eq!(status(&response), 200);
    assert_eq!(body(&response), "not found");
}
