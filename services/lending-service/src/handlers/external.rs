//! Partner API under `/external/v1`, behind `X-Api-Key`

use crate::handlers::web::{availability, create_transaction, get_transaction, list_transactions};
use crate::security_middleware::PartnerApiKey;
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig, api_keys: &[String]) {
    cfg.service(
        web::scope("/external/v1")
            .wrap(PartnerApiKey::new(api_keys))
            .route("/transactions", web::get().to(list_transactions))
            .route("/transactions", web::post().to(create_transaction))
            .route("/transactions/{id}", web::get().to(get_transaction))
            .route("/consumers/{id}/availability", web::get().to(availability)),
    );
}
