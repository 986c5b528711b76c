use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use credit_core::{CreditError, FieldError};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LendingServiceError>;

#[derive(Error, Debug)]
pub enum LendingServiceError {
    #[error(transparent)]
    Credit(#[from] CreditError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for LendingServiceError {
    fn from(err: serde_json::Error) -> Self {
        LendingServiceError::Internal(format!("JSON serialization error: {}", err))
    }
}

impl ResponseError for LendingServiceError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_message = match self {
            // storage details stay in the logs
            LendingServiceError::Credit(CreditError::PersistenceFailure { operation, .. }) => {
                format!("{}: persistence failure", operation)
            }
            LendingServiceError::Database(_) => "Database error".to_string(),
            other => other.to_string(),
        };

        let mut body = json!({
            "error": {
                "code": status_code.as_u16(),
                "message": error_message,
                "type": self.error_type()
            }
        });
        if let Some(fields) = self.field_errors() {
            body["error"]["fields"] = json!(fields);
        }

        HttpResponse::build(status_code).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            LendingServiceError::Credit(err) => match err {
                CreditError::InvalidTenor { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                CreditError::InsufficientCreditLimit { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                CreditError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                CreditError::NotFound { .. } => StatusCode::NOT_FOUND,
                CreditError::Conflict { .. } => StatusCode::CONFLICT,
                CreditError::PersistenceFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            LendingServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            LendingServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            LendingServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            LendingServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            LendingServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl LendingServiceError {
    pub fn error_type(&self) -> &str {
        match self {
            LendingServiceError::Credit(err) => err.kind(),
            LendingServiceError::Database(_) => "database_error",
            LendingServiceError::BadRequest(_) => "bad_request",
            LendingServiceError::NotFound(_) => "not_found",
            LendingServiceError::Unauthorized(_) => "unauthorized",
            LendingServiceError::Internal(_) => "internal_error",
        }
    }

    fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            LendingServiceError::Credit(CreditError::Validation { errors, .. }) => Some(errors),
            _ => None,
        }
    }
}
