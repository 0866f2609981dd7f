use actix_web::test;
use serde_json::Value;

use crate::create_test_app;
use crate::support::app_builder::{free_state, ledger_state};

#[actix_web::test]
async fn health_without_ledger() {
    let app = create_test_app!(free_state().await);

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    assert!(resp.headers().contains_key("x-request-id"));

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["db"], "disabled");
    assert_eq!(body["migrations"], "n/a");
    assert!(body.get("pending_settlements").is_none());
}

#[actix_web::test]
async fn health_with_ledger_reports_migrations() {
    let app = create_test_app!(ledger_state().await);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["db"], "ok");
    assert!(body["migrations"]
        .as_str()
        .is_some_and(|v| v.starts_with("m2026")));
    assert_eq!(body["pending_settlements"], 0);
    assert_eq!(body["rooms"], 0);
}
