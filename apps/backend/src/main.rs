use actix_web::{web, App, HttpServer};
use gamehall::config::game::GameConfig;
use gamehall::services::settlement::spawn_reconciler;
use gamehall::{build_state, cors_middleware, routes, DbProfile, RequestLog, SecurityConfig};
use tokio_util::sync::CancellationToken;
use tracing::info;

mod telemetry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    telemetry::init_tracing();

    // Environment variables must be set by the runtime environment
    // (docker-compose env_file, or `set -a; . ./.env; set +a` locally).
    let host = std::env::var("GAMEHALL_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("GAMEHALL_PORT")
        .unwrap_or_else(|_| "3001".to_string())
        .parse::<u16>()
        .unwrap_or_else(|_| {
            eprintln!("❌ GAMEHALL_PORT must be a valid port number");
            std::process::exit(1);
        });

    let security_config = SecurityConfig::from_env().unwrap_or_else(|e| {
        eprintln!("❌ {e}");
        std::process::exit(1);
    });
    let game_config = GameConfig::from_env().unwrap_or_else(|e| {
        eprintln!("❌ Invalid game configuration: {e}");
        std::process::exit(1);
    });

    let app_state = match build_state()
        .with_db(DbProfile::Prod)
        .with_security(security_config)
        .with_game_config(game_config.clone())
        .build()
        .await
    {
        Ok(state) => state,
        Err(e) => {
            eprintln!("❌ Failed to build application state: {e}");
            std::process::exit(1);
        }
    };
    info!("database connected and migrated");

    let shutdown = CancellationToken::new();
    let sweeper = app_state
        .rooms
        .clone()
        .spawn_sweeper(game_config.sweep_interval, shutdown.child_token());
    let reconciler = app_state.settlement.clone().map(|coordinator| {
        spawn_reconciler(
            coordinator,
            game_config.reconciliation_interval,
            shutdown.child_token(),
        )
    });

    let rooms = app_state.rooms.clone();
    let data = web::Data::new(app_state);

    info!(%host, port, "starting gamehall");
    let served = HttpServer::new(move || {
        App::new()
            .wrap(cors_middleware())
            .wrap(RequestLog)
            .app_data(data.clone())
            .configure(routes::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await;

    shutdown.cancel();
    rooms.shutdown_all().await;
    let _ = sweeper.await;
    if let Some(reconciler) = reconciler {
        let _ = reconciler.await;
    }
    info!("gamehall stopped");
    served
}
