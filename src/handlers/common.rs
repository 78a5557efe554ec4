use crate::errors::ServiceError;
use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// JSON body extractor whose rejections render as `validation_error`
/// instead of axum's plain-text rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| JsonBody(value))
            .map_err(|rejection| ServiceError::ValidationError(rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        item_id: String,
    }

    #[tokio::test]
    async fn malformed_body_is_a_validation_error() {
        let request = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from("{\"quantity\": 1}"))
            .unwrap();

        let rejection = JsonBody::<Payload>::from_request(request, &()).await.unwrap_err();
        assert_eq!(rejection.code(), "validation_error");
        assert_eq!(rejection.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn well_formed_body_is_extracted() {
        let request = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from("{\"item_id\": \"IT001\"}"))
            .unwrap();

        let JsonBody(payload) = JsonBody::<Payload>::from_request(request, &()).await.unwrap();
        assert_eq!(payload.item_id, "IT001");
    }
}
