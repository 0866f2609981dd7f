//! Assertions on `application/problem+json` error bodies, kept free of
//! backend types so integration tests check the wire contract itself.

use actix_web::http::StatusCode;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ProblemDetailsLike {
    #[serde(rename = "type")]
    type_: String,
    title: String,
    status: u16,
    detail: String,
    code: String,
}

/// Assert status, code and (optionally) a detail substring of an error
/// response.
pub async fn assert_problem_details(
    resp: actix_web::dev::ServiceResponse<actix_web::body::BoxBody>,
    expected_code: &str,
    expected_status: StatusCode,
    expected_detail_contains: Option<&str>,
) {
    assert_eq!(resp.status(), expected_status);
    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert_eq!(content_type, "application/problem+json");

    let body = actix_web::test::read_body(resp).await;
    let problem: ProblemDetailsLike =
        serde_json::from_slice(&body).expect("body should be ProblemDetails JSON");

    assert_eq!(problem.code, expected_code);
    assert_eq!(problem.status, expected_status.as_u16());
    assert!(problem.type_.ends_with(expected_code), "type was {}", problem.type_);
    assert!(!problem.title.is_empty());
    if let Some(expected) = expected_detail_contains {
        assert!(
            problem.detail.contains(expected),
            "Expected detail to contain '{expected}', but got '{}'",
            problem.detail
        );
    }
}
