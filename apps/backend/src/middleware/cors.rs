use std::env;

use actix_cors::Cors;
use actix_web::http::header;

/// CORS for the browser client. Origins come from `GAMEHALL_CORS_ORIGINS`
/// (comma-separated). Only the websocket upgrade and the health check are
/// exposed, so only GET is allowed.
pub fn cors_middleware() -> Cors {
    let allowed_raw = env::var("GAMEHALL_CORS_ORIGINS").unwrap_or_default();

    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "OPTIONS"])
        .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT])
        .expose_headers(vec![header::HeaderName::from_static("x-request-id")])
        .max_age(3600);

    for origin in parse_origins(&allowed_raw) {
        cors = cors.allowed_origin(&origin);
    }
    cors
}

/// Keep http(s) origins, skipping blanks and "null". Falls back to the local
/// dev client when nothing valid is configured.
fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "null")
        .filter(|s| s.starts_with("http://") || s.starts_with("https://"))
        .map(str::to_string)
        .collect();

    if origins.is_empty() {
        vec![
            "http://localhost:3000".to_string(),
            "http://127.0.0.1:3000".to_string(),
        ]
    } else {
        origins
    }
}
