//! The upgrade endpoint refuses anyone without a valid access token.

use std::time::{Duration, SystemTime};

use actix_web::http::StatusCode;
use actix_web::test;
use backend_test_support::problem_details::assert_problem_details;
use gamehall::{mint_access_token, SecurityConfig};

use crate::create_test_app;
use crate::support::app_builder::{free_state, TEST_SECRET};

#[actix_web::test]
async fn missing_token_is_unauthorized() {
    let app = create_test_app!(free_state().await);
    let req = test::TestRequest::get().uri("/api/ws").to_request();
    let resp = test::call_service(&app, req).await;
    assert_problem_details(resp, "UNAUTHORIZED", StatusCode::UNAUTHORIZED, None).await;
}

#[actix_web::test]
async fn garbage_token_is_rejected() {
    let app = create_test_app!(free_state().await);
    let req = test::TestRequest::get()
        .uri("/api/ws?token=not-a-jwt")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_problem_details(
        resp,
        "UNAUTHORIZED_INVALID_JWT",
        StatusCode::UNAUTHORIZED,
        None,
    )
    .await;
}

#[actix_web::test]
async fn token_signed_elsewhere_is_rejected() {
    let app = create_test_app!(free_state().await);
    let foreign = SecurityConfig::new(b"some_other_secret_entirely_0000".as_slice());
    let token = mint_access_token(7, SystemTime::now(), 900, &foreign).unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/api/ws?token={token}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn expired_token_is_rejected() {
    let app = create_test_app!(free_state().await);
    let security = SecurityConfig::new(TEST_SECRET);
    let issued = SystemTime::now() - Duration::from_secs(3_600);
    let token = mint_access_token(7, issued, 60, &security).unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/api/ws?token={token}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn valid_token_without_upgrade_headers_is_a_bad_request() {
    let app = create_test_app!(free_state().await);
    let token = mint_access_token(7, SystemTime::now(), 900, &SecurityConfig::new(TEST_SECRET))
        .unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/api/ws?token={token}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_problem_details(resp, "BAD_REQUEST", StatusCode::BAD_REQUEST, Some("handshake"))
        .await;
}
