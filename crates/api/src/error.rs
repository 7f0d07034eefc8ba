use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{FormRejection, PathRejection};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use hana_models::{ErrorShape, HanaError};
use tracing::error;

/// Handler error: renders `HanaError` as `{"detail": ...}` with its HTTP status.
#[derive(Debug)]
pub struct ApiError(pub HanaError);

impl From<HanaError> for ApiError {
    fn from(err: HanaError) -> Self {
        Self(err)
    }
}

/// Maps an extractor failure onto the JSON error body. Body-limit overflows stay 413.
fn rejected(status: StatusCode, body_text: String) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError(HanaError::RequestTooLarge)
    } else {
        ApiError(HanaError::InvalidRequest { reason: body_text })
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        rejected(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        rejected(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        rejected(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        rejected(err.status(), format!("Failed to read upload: {}", err.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let shape = if self.0.is_internal() {
            error!("Request failed: {}", self.0);
            ErrorShape {
                detail: "Internal server error".to_string(),
            }
        } else {
            self.0.to_error_shape()
        };

        let mut response = (status, Json(shape)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
