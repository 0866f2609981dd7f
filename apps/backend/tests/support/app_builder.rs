use gamehall::{build_state, AppState, DbProfile, SecurityConfig};

pub const TEST_SECRET: &[u8] = b"test_secret_key_for_testing_purposes_only";

/// The production route table and request logging around an `AppState`.
#[macro_export]
macro_rules! create_test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(gamehall::RequestLog)
                .app_data(actix_web::web::Data::new($state))
                .configure(gamehall::routes::configure),
        )
        .await
    };
}

/// State without a ledger: free rooms only.
pub async fn free_state() -> AppState {
    build_state()
        .with_security(SecurityConfig::new(TEST_SECRET))
        .build()
        .await
        .expect("free state builds")
}

/// State over a private in-memory ledger.
pub async fn ledger_state() -> AppState {
    build_state()
        .with_db(DbProfile::InMemory)
        .with_security(SecurityConfig::new(TEST_SECRET))
        .build()
        .await
        .expect("ledger state builds")
}
