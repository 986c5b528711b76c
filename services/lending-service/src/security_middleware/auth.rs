use crate::errors::LendingServiceError;
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, ResponseError,
};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use std::rc::Rc;

/// Claims carried by business web tokens. Tokens are issued elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub exp: usize,
}

/// HS256 bearer-token check for the `/web/v1` scope
pub struct JwtAuth {
    secret: String,
}

impl JwtAuth {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddleware {
            service: Rc::new(service),
            secret: self.secret.clone(),
        }))
    }
}

pub struct JwtAuthMiddleware<S> {
    service: Rc<S>,
    secret: String,
}

fn bearer_token(req: &ServiceRequest) -> Result<String, LendingServiceError> {
    let value = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| {
            LendingServiceError::Unauthorized("Missing Authorization header".to_string())
        })?;

    let auth_str = value.to_str().unwrap_or("");
    auth_str
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or_else(|| LendingServiceError::Unauthorized("Invalid auth header format".to_string()))
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddleware<S>
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
        let token = match bearer_token(&req) {
            Ok(token) => token,
            Err(err) => {
                let response = req.into_response(err.error_response()).map_into_right_body();
                return Box::pin(async { Ok(response) });
            }
        };

        let validation = Validation::new(Algorithm::HS256);
        match decode::<Claims>(
            &token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        ) {
            Ok(token_data) => {
                // Handlers read the caller from request extensions
                req.extensions_mut().insert(token_data.claims);

                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            Err(err) => {
                tracing::warn!("JWT validation failed: {:?}", err);
                let response = req
                    .into_response(
                        LendingServiceError::Unauthorized("Invalid or expired token".to_string())
                            .error_response(),
                    )
                    .map_into_right_body();
                Box::pin(async { Ok(response) })
            }
        }
    }
}
