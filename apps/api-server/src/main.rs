//! # Faultline API Server
//!
//! Actix-web app wired with the error reporting middleware.

use std::sync::Arc;

use actix_web::{App, HttpServer};
use tracing_actix_web::TracingLogger;

use faultline_core::ports::Notifier;
use faultline_infra::TracingNotifier;

mod config;
mod handlers;
mod middleware;
mod telemetry;

use config::{AppConfig, NotifierSettings};
use middleware::ErrorReporting;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    tracing::info!(
        "Starting Faultline API server on {}:{}",
        config.host,
        config.port
    );

    let notifier = build_notifier(&config.notifier)?;
    let reporter = Arc::new(config.reporter);

    HttpServer::new(move || {
        App::new()
            .wrap(ErrorReporting::new(notifier.clone(), reporter.clone()))
            .wrap(TracingLogger::default())
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

fn build_notifier(settings: &NotifierSettings) -> std::io::Result<Arc<dyn Notifier>> {
    match settings {
        NotifierSettings::Tracing => {
            tracing::warn!("FAULTLINE_ENDPOINT not set. Errors will only be logged.");
            Ok(Arc::new(TracingNotifier))
        }
        #[cfg(feature = "webhook")]
        NotifierSettings::Webhook { endpoint, api_key } => {
            use faultline_infra::{WebhookConfig, WebhookNotifier};

            let notifier = WebhookNotifier::new(WebhookConfig::new(endpoint, api_key))
                .map_err(|e| std::io::Error::other(e.to_string()))?;
            tracing::info!(endpoint = %endpoint, "Delivering error notices to webhook");
            Ok(Arc::new(notifier))
        }
        #[cfg(not(feature = "webhook"))]
        NotifierSettings::Webhook { .. } => {
            tracing::warn!("Built without webhook feature. Errors will only be logged.");
            Ok(Arc::new(TracingNotifier))
        }
    }
}
