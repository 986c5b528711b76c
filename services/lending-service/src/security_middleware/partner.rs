use crate::errors::LendingServiceError;
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, ResponseError,
};
use futures_util::future::LocalBoxFuture;
use std::collections::HashSet;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;

pub const API_KEY_HEADER: &str = "X-Api-Key";

/// `X-Api-Key` check for the `/external/v1` partner scope
pub struct PartnerApiKey {
    keys: Arc<HashSet<String>>,
}

impl PartnerApiKey {
    pub fn new(keys: &[String]) -> Self {
        Self {
            keys: Arc::new(keys.iter().filter(|k| !k.is_empty()).cloned().collect()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for PartnerApiKey
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = PartnerApiKeyMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(PartnerApiKeyMiddleware {
            service: Rc::new(service),
            keys: self.keys.clone(),
        }))
    }
}

pub struct PartnerApiKeyMiddleware<S> {
    service: Rc<S>,
    keys: Arc<HashSet<String>>,
}

impl<S, B> Service<ServiceRequest> for PartnerApiKeyMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let presented = req
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim);

        let rejection = match presented {
            None => Some("Missing X-Api-Key header"),
            Some(key) if !self.keys.contains(key) => Some("Invalid API key"),
            Some(_) => None,
        };

        if let Some(message) = rejection {
            tracing::warn!("Partner request rejected on {}: {}", req.path(), message);
            let error = LendingServiceError::Unauthorized(message.to_string());
            let response = req
                .into_response(error.error_response())
                .map_into_right_body();
            return Box::pin(async { Ok(response) });
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
    }
}
