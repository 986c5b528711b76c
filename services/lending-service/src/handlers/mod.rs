pub mod external;
pub mod web;

use crate::config::AuthConfig;
use crate::errors::LendingServiceError;
use crate::metrics;
use actix_web::{web as aw, HttpResponse};
use serde_json::json;

/// Health check endpoint
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "lending-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Prometheus metrics endpoint
pub async fn metrics_endpoint() -> Result<HttpResponse, LendingServiceError> {
    let body = metrics::metrics_handler()
        .map_err(|e| LendingServiceError::Internal(format!("Failed to encode metrics: {}", e)))?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(body))
}

/// Configure all routes. `/health` and `/metrics` stay open; the business and
/// partner surfaces carry their own authentication.
pub fn configure_routes(cfg: &mut aw::ServiceConfig, auth: &AuthConfig) {
    // Extractor failures share the JSON error body
    cfg.app_data(aw::JsonConfig::default().error_handler(|err, _| {
        LendingServiceError::BadRequest(err.to_string()).into()
    }))
    .app_data(aw::QueryConfig::default().error_handler(|err, _| {
        LendingServiceError::BadRequest(err.to_string()).into()
    }))
    .app_data(aw::PathConfig::default().error_handler(|err, _| {
        LendingServiceError::NotFound(err.to_string()).into()
    }));

    cfg.route("/health", aw::get().to(health_check))
        .route("/metrics", aw::get().to(metrics_endpoint))
        .configure(|cfg| web::configure(cfg, &auth.jwt_secret))
        .configure(|cfg| external::configure(cfg, &auth.partner_api_keys));
}
