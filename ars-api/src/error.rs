use ars_core::CoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    Core(CoreError),
    Anyhow(anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            AppError::AuthorizationError(_) => StatusCode::FORBIDDEN,
            AppError::Core(err) => match err {
                CoreError::NotFoundError(_) => StatusCode::NOT_FOUND,
                CoreError::InvalidStateError { .. } | CoreError::ConflictError(_) => StatusCode::CONFLICT,
                CoreError::ValidationError(_)
                | CoreError::CapacityExceeded { .. }
                | CoreError::SeatUnavailable(_) => StatusCode::BAD_REQUEST,
                CoreError::TransientError(_) => StatusCode::SERVICE_UNAVAILABLE,
                CoreError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (kind, error_message) = match self {
            AppError::AuthenticationError(msg) => ("UNAUTHENTICATED", msg),
            AppError::AuthorizationError(msg) => ("FORBIDDEN", msg),
            AppError::Core(CoreError::InternalError(msg)) => {
                tracing::error!("Internal Server Error: {}", msg);
                ("INTERNAL", "Internal Server Error".to_string())
            }
            AppError::Core(err) => {
                if let CoreError::TransientError(msg) = &err {
                    tracing::warn!("Datastore unavailable: {}", msg);
                }
                (err.kind(), err.to_string())
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                ("INTERNAL", "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        Self::Core(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CoreError::NotFoundError("x".into()), StatusCode::NOT_FOUND),
            (CoreError::ValidationError("x".into()), StatusCode::BAD_REQUEST),
            (CoreError::CapacityExceeded { capacity: 1, taken: 1, requested: 1 }, StatusCode::BAD_REQUEST),
            (CoreError::SeatUnavailable("x".into()), StatusCode::BAD_REQUEST),
            (
                CoreError::InvalidStateError { from: "CANCELLED".into(), action: "confirm".into() },
                StatusCode::CONFLICT,
            ),
            (CoreError::ConflictError("x".into()), StatusCode::CONFLICT),
            (CoreError::TransientError("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (CoreError::InternalError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
        assert_eq!(AppError::AuthorizationError("no".into()).status(), StatusCode::FORBIDDEN);
    }
}
