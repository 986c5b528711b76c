//! Business web API under `/web/v1`, behind JWT bearer auth

use crate::errors::LendingServiceError;
use crate::models::{
    AvailabilityQuery, ConsumerListQuery, CreditLimitListQuery, StatusCatalogueResponse,
    StatusChangeResponse, TransactionListQuery,
};
use crate::security_middleware::JwtAuth;
use crate::services::LendingService;
use actix_web::{web, HttpResponse};
use credit_core::{
    ConsumerRequest, CreditLimitRequest, RecordStatus, StatusChange, TransactionRequest,
};
use std::sync::Arc;
use uuid::Uuid;

type SharedService = web::Data<Arc<LendingService>>;

pub fn configure(cfg: &mut web::ServiceConfig, jwt_secret: &str) {
    cfg.service(
        web::scope("/web/v1")
            .wrap(JwtAuth::new(jwt_secret.to_string()))
            .route("/statuses", web::get().to(list_statuses))
            // Consumers
            .route("/consumers", web::get().to(list_consumers))
            .route("/consumers", web::post().to(create_consumer))
            .route("/consumers/status", web::put().to(set_consumer_status))
            .route("/consumers/{id}", web::get().to(get_consumer))
            .route("/consumers/{id}", web::put().to(update_consumer))
            .route("/consumers/{id}/availability", web::get().to(availability))
            // Credit limits
            .route("/credit-limits", web::get().to(list_credit_limits))
            .route("/credit-limits", web::post().to(create_credit_limit))
            .route("/credit-limits/status", web::put().to(set_credit_limit_status))
            .route("/credit-limits/{id}", web::get().to(get_credit_limit))
            .route("/credit-limits/{id}", web::put().to(update_credit_limit))
            // Transactions
            .route("/transactions", web::get().to(list_transactions))
            .route("/transactions", web::post().to(create_transaction))
            .route("/transactions/status", web::put().to(set_transaction_status))
            .route("/transactions/{id}", web::get().to(get_transaction))
            .route("/transactions/{id}", web::put().to(update_transaction)),
    );
}

/// Status catalogue shared by all three record kinds
pub async fn list_statuses() -> HttpResponse {
    HttpResponse::Ok().json(StatusCatalogueResponse {
        statuses: RecordStatus::catalogue(),
    })
}

// Consumers

pub async fn list_consumers(
    service: SharedService,
    query: web::Query<ConsumerListQuery>,
) -> Result<HttpResponse, LendingServiceError> {
    let filter = query
        .into_inner()
        .into_filter()
        .map_err(LendingServiceError::BadRequest)?;
    let page = service.list_consumers(filter).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn get_consumer(
    service: SharedService,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, LendingServiceError> {
    let consumer = service.get_consumer(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(consumer))
}

pub async fn create_consumer(
    service: SharedService,
    request: web::Json<ConsumerRequest>,
) -> Result<HttpResponse, LendingServiceError> {
    let consumer = service.create_consumer(request.into_inner()).await?;
    Ok(HttpResponse::Created().json(consumer))
}

pub async fn update_consumer(
    service: SharedService,
    path: web::Path<Uuid>,
    request: web::Json<ConsumerRequest>,
) -> Result<HttpResponse, LendingServiceError> {
    let consumer = service
        .update_consumer(path.into_inner(), request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(consumer))
}

pub async fn set_consumer_status(
    service: SharedService,
    request: web::Json<StatusChange>,
) -> Result<HttpResponse, LendingServiceError> {
    let change = request.into_inner();
    let status = change.status;
    let updated = service.set_consumer_status(change).await?;
    Ok(HttpResponse::Ok().json(StatusChangeResponse { updated, status }))
}

/// Remaining capacity per tenor; `?tenor=N` narrows to one tenor
pub async fn availability(
    service: SharedService,
    path: web::Path<Uuid>,
    query: web::Query<AvailabilityQuery>,
) -> Result<HttpResponse, LendingServiceError> {
    let response = service.availability(path.into_inner(), query.tenor).await?;
    Ok(HttpResponse::Ok().json(response))
}

// Credit limits

pub async fn list_credit_limits(
    service: SharedService,
    query: web::Query<CreditLimitListQuery>,
) -> Result<HttpResponse, LendingServiceError> {
    let filter = query
        .into_inner()
        .into_filter()
        .map_err(LendingServiceError::BadRequest)?;
    let page = service.list_credit_limits(filter).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn get_credit_limit(
    service: SharedService,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, LendingServiceError> {
    let limit = service.get_credit_limit(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(limit))
}

pub async fn create_credit_limit(
    service: SharedService,
    request: web::Json<CreditLimitRequest>,
) -> Result<HttpResponse, LendingServiceError> {
    let limit = service.create_credit_limit(request.into_inner()).await?;
    Ok(HttpResponse::Created().json(limit))
}

pub async fn update_credit_limit(
    service: SharedService,
    path: web::Path<Uuid>,
    request: web::Json<CreditLimitRequest>,
) -> Result<HttpResponse, LendingServiceError> {
    let limit = service
        .update_credit_limit(path.into_inner(), request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(limit))
}

pub async fn set_credit_limit_status(
    service: SharedService,
    request: web::Json<StatusChange>,
) -> Result<HttpResponse, LendingServiceError> {
    let change = request.into_inner();
    let status = change.status;
    let updated = service.set_credit_limit_status(change).await?;
    Ok(HttpResponse::Ok().json(StatusChangeResponse { updated, status }))
}

// Transactions

pub async fn list_transactions(
    service: SharedService,
    query: web::Query<TransactionListQuery>,
) -> Result<HttpResponse, LendingServiceError> {
    let filter = query
        .into_inner()
        .into_filter()
        .map_err(LendingServiceError::BadRequest)?;
    let page = service.list_transactions(filter).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn get_transaction(
    service: SharedService,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, LendingServiceError> {
    let transaction = service.get_transaction(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(transaction))
}

pub async fn create_transaction(
    service: SharedService,
    request: web::Json<TransactionRequest>,
) -> Result<HttpResponse, LendingServiceError> {
    let transaction = service.create_transaction(request.into_inner()).await?;
    Ok(HttpResponse::Created().json(transaction))
}

pub async fn update_transaction(
    service: SharedService,
    path: web::Path<Uuid>,
    request: web::Json<TransactionRequest>,
) -> Result<HttpResponse, LendingServiceError> {
    let transaction = service
        .update_transaction(path.into_inner(), request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(transaction))
}

pub async fn set_transaction_status(
    service: SharedService,
    request: web::Json<StatusChange>,
) -> Result<HttpResponse, LendingServiceError> {
    let change = request.into_inner();
    let status = change.status;
    let updated = service.set_transaction_status(change).await?;
    Ok(HttpResponse::Ok().json(StatusChangeResponse { updated, status }))
}
