//! # API Errors
//!
//! Maps [`VisionSprintError`] onto HTTP status codes and the JSON error body
//! `{ "success": false, "error": "..." }`.
//!
//! [`ApiJson`] and [`ApiPath`] wrap axum's extractors so malformed bodies and
//! path parameters get the same JSON error body as every other failure.

use super::types::ErrorResponse;
use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Path, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use visionsprint_core::VisionSprintError;

/// Error returned by every fallible handler.
#[derive(Debug)]
pub struct ApiError(pub VisionSprintError);

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            VisionSprintError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            VisionSprintError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            VisionSprintError::Forbidden(_) => StatusCode::FORBIDDEN,
            VisionSprintError::NotFound { .. } => StatusCode::NOT_FOUND,
            VisionSprintError::Conflict(_)
            | VisionSprintError::StageClosed { .. }
            | VisionSprintError::LimitReached(_) => StatusCode::CONFLICT,
            VisionSprintError::SerializationError(_) | VisionSprintError::IoError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<VisionSprintError> for ApiError {
    fn from(err: VisionSprintError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(VisionSprintError::InvalidInput(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(VisionSprintError::InvalidInput(rejection.body_text()))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Storage details stay in the log.
            tracing::error!(event = "internal_error", "{}", self.0);
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// =============================================================================
// EXTRACTORS
// =============================================================================

/// JSON request body. Oversized bodies keep their 413, every other
/// rejection becomes a 400 [`ApiError`].
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => Err((
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(ErrorResponse::new(rejection.body_text())),
            )
                .into_response()),
            Err(rejection) => Err(ApiError::from(rejection).into_response()),
        }
    }
}

/// Path parameters; rejections become a 400 [`ApiError`].
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (
                VisionSprintError::InvalidInput("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                VisionSprintError::Unauthenticated("x".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                VisionSprintError::Forbidden("x".into()),
                StatusCode::FORBIDDEN,
            ),
            (
                VisionSprintError::NotFound { kind: "idea", id: 1 },
                StatusCode::NOT_FOUND,
            ),
            (
                VisionSprintError::StageClosed {
                    action: "vote",
                    stage: "sprint",
                },
                StatusCode::CONFLICT,
            ),
            (
                VisionSprintError::LimitReached("x".into()),
                StatusCode::CONFLICT,
            ),
            (
                VisionSprintError::IoError("disk".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }
}
