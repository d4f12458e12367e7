//! Mapping from core errors to HTTP responses.
//!
//! Every error body has the shape `{"detail": "<message>"}`, including
//! malformed request bodies.

use std::fmt;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use todomine_core::{CoreError, DatabaseError};

/// Why a handler failed.
#[derive(Debug)]
pub enum ApiError {
    Core(CoreError),
    /// The request body was not valid JSON for the expected type.
    Body(JsonRejection),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(CoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Core(CoreError::Rejected(_)) => StatusCode::BAD_REQUEST,
            ApiError::Core(CoreError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Core(CoreError::Database(DatabaseError::Locked)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Body(rejection) => rejection.status(),
        }
    }

    /// The shared game lock was poisoned by a panicking handler.
    pub fn poisoned() -> Self {
        ApiError::Core(CoreError::Database(DatabaseError::Poisoned))
    }

    pub fn into_core(self) -> CoreError {
        match self {
            ApiError::Core(err) => err,
            ApiError::Body(rejection) => CoreError::Custom(rejection.body_text()),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Core(err) => write!(f, "{err}"),
            ApiError::Body(rejection) => f.write_str(&rejection.body_text()),
        }
    }
}

impl<E: Into<CoreError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        ApiError::Core(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// `Json` extractor whose rejections answer with a `{"detail"}` body.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::Body(rejection)),
        }
    }
}
