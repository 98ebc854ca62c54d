//! HTTP handlers and route configuration.

mod health;
mod orders;

use actix_web::web;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_check))
            .route("/orders/{id}", web::get().to(orders::get_order))
            .route("/checkout", web::post().to(orders::checkout))
            .route("/crash", web::get().to(orders::crash)),
    );
}
