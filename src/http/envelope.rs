//! Uniform response envelope (spec.md §4.H).

use axum::Json;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self { code: 200, message: "OK".to_string(), data: Some(data) }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Error envelope, `data` always absent per spec.md §4.H.
#[derive(Debug)]
pub struct ErrorEnvelope {
    pub code: u16,
    pub message: String,
}

impl From<AppError> for ErrorEnvelope {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Invalid(message) => Self { code: 400, message },
            AppError::System(message) => Self { code: 500, message },
            AppError::NotFound => Self { code: 500, message: "未知错误".to_string() },
        }
    }
}

impl IntoResponse for ErrorEnvelope {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Envelope::<()> { code: self.code, message: self.message, data: None };
        (status, Json(body)).into_response()
    }
}

/// Convenience alias for handler return types.
pub type HttpResult<T> = Result<Envelope<T>, ErrorEnvelope>;

/// Drop-in replacement for `axum::Json` that maps a deserialization failure
/// to the uniform envelope instead of axum's default plain-text rejection
/// (spec.md §4.H/§7: malformed request bodies are `code=500,
/// message=SYSTEM_ERROR`).
pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ErrorEnvelope;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(_rejection) => Err(ErrorEnvelope { code: 500, message: "SYSTEM_ERROR".to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_maps_to_400_with_message() {
        let envelope: ErrorEnvelope = AppError::invalid("bad").into();
        assert_eq!(envelope.code, 400);
        assert_eq!(envelope.message, "bad");
    }

    #[test]
    fn unknown_maps_to_500_with_generic_message() {
        let envelope: ErrorEnvelope = AppError::NotFound.into();
        assert_eq!(envelope.code, 500);
        assert_eq!(envelope.message, "未知错误");
    }

    #[derive(serde::Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        x: i32,
    }

    #[tokio::test]
    async fn app_json_maps_malformed_body_to_system_error() {
        let req = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("not json"))
            .unwrap();

        let Err(envelope) = AppJson::<Payload>::from_request(req, &()).await else {
            panic!("expected rejection for malformed body");
        };
        assert_eq!(envelope.code, 500);
        assert_eq!(envelope.message, "SYSTEM_ERROR");
    }

    #[tokio::test]
    async fn app_json_passes_through_valid_body() {
        let req = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(r#"{"x":1}"#))
            .unwrap();

        let AppJson(payload) = AppJson::<Payload>::from_request(req, &()).await.unwrap();
        assert_eq!(payload.x, 1);
    }
}
