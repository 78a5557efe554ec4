use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{error::DbErr, TransactionError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Not Found", "Conflict")
    #[schema(example = "Unprocessable Entity")]
    pub error: String,
    /// Stable machine-readable error kind
    #[schema(example = "insufficient_quantity")]
    pub code: String,
    /// Human-readable description
    #[schema(example = "Insufficient quantity: item IT001 has 1 available, 2 requested")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error was produced
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Item unavailable: {0}")]
    ItemUnavailable(String),

    #[error("Insufficient quantity: {0}")]
    InsufficientQuantity(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("No active loan: {0}")]
    NoActiveLoan(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<TransactionError<ServiceError>> for ServiceError {
    fn from(err: TransactionError<ServiceError>) -> Self {
        match err {
            TransactionError::Connection(e) => ServiceError::DatabaseError(e),
            TransactionError::Transaction(e) => e,
        }
    }
}

impl ServiceError {
    pub fn db_error(error: DbErr) -> Self {
        ServiceError::DatabaseError(error)
    }

    /// Stable code a client can branch on.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ValidationError(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::ItemUnavailable(_) => "item_unavailable",
            Self::InsufficientQuantity(_) => "insufficient_quantity",
            Self::InvalidState(_) => "invalid_state",
            Self::NoActiveLoan(_) => "no_active_loan",
            Self::Conflict(_) => "conflict",
            Self::DatabaseError(_) | Self::ConcurrentModification(_) => "storage_failure",
            Self::EventError(_) | Self::InternalError(_) | Self::Other(_) => "internal_error",
        }
    }

    /// Whether the whole operation may be resubmitted unchanged.
    ///
    /// Storage failures never leave partial effects behind, so they are safe
    /// to retry. Business-rule rejections are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DatabaseError(_) | Self::ConcurrentModification(_)
        )
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ItemUnavailable(_) | Self::InsufficientQuantity(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::InvalidState(_) | Self::NoActiveLoan(_) | Self::Conflict(_) => {
                StatusCode::CONFLICT
            }
            Self::DatabaseError(_) | Self::ConcurrentModification(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::EventError(_) | Self::InternalError(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Storage and internal errors return generic messages to avoid leaking details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) | Self::ConcurrentModification(_) => {
                "Storage temporarily unavailable; the request can be retried".to_string()
            }
            Self::EventError(_) | Self::InternalError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "request failed");
        }

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            code: self.code().to_string(),
            message: self.response_message(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn service_error_response_includes_request_id_and_code() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::InsufficientQuantity("item IT001".into()).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert_eq!(payload.code, "insufficient_quantity");
    }

    #[test]
    fn every_business_kind_is_distinguishable() {
        let errors = [
            ServiceError::ValidationError("x".into()),
            ServiceError::NotFound("x".into()),
            ServiceError::ItemUnavailable("x".into()),
            ServiceError::InsufficientQuantity("x".into()),
            ServiceError::InvalidState("x".into()),
            ServiceError::NoActiveLoan("x".into()),
            ServiceError::DatabaseError(DbErr::Custom("x".into())),
        ];
        let mut codes: Vec<_> = errors.iter().map(ServiceError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::ValidationError("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::InsufficientQuantity("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::InvalidState("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("x".into())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn only_storage_failures_are_retryable() {
        assert!(ServiceError::DatabaseError(DbErr::Custom("busy".into())).is_retryable());
        assert!(ServiceError::ConcurrentModification("IT001".into()).is_retryable());
        assert!(!ServiceError::InsufficientQuantity("x".into()).is_retryable());
        assert!(!ServiceError::InvalidState("x".into()).is_retryable());
    }

    #[test]
    fn transaction_errors_unwrap_to_the_inner_kind() {
        let inner: ServiceError =
            TransactionError::Transaction(ServiceError::NoActiveLoan("IT001".into())).into();
        assert_eq!(inner.code(), "no_active_loan");

        let conn: ServiceError =
            TransactionError::<ServiceError>::Connection(DbErr::Custom("gone".into())).into();
        assert!(conn.is_retryable());
    }

    #[test]
    fn response_message_hides_storage_details() {
        assert!(!ServiceError::DatabaseError(DbErr::Custom("secret dsn".into()))
            .response_message()
            .contains("secret"));
        assert_eq!(
            ServiceError::NotFound("Item IT009".into()).response_message(),
            "Not found: Item IT009"
        );
    }
}
