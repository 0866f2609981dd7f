use actix_web::web;

pub mod health;
pub mod realtime;

/// Register every route. `main.rs` adds the middleware stack around this.
pub fn configure(cfg: &mut web::ServiceConfig) {
    // Health check routes: /health
    cfg.service(web::scope("/health").configure(health::configure_routes));

    // Realtime routes: /api/ws
    cfg.service(web::scope("/api/ws").configure(realtime::configure_routes));
}
