//! API error types

use std::fmt;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kameo::error::{Infallible, SendError};
use uplift_api::responses::ErrorResponse;
use uplift_core::{CoreError, DispatchError, StoreError};

/// Wrapper for API errors with status codes
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: ErrorResponse,
}

impl AppError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            error: ErrorResponse {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "ENGINE_UNAVAILABLE", message)
    }

    /// Actor mailbox failures, as opposed to handler errors
    fn engine<M, E: fmt::Display>(err: &SendError<M, E>) -> Self {
        tracing::error!(error = %err, "upgrade engine unreachable");
        Self::unavailable(format!("upgrade engine unavailable: {err}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        let status = match &err {
            DispatchError::UnknownHost(_) | DispatchError::UnknownComponent { .. } => {
                StatusCode::NOT_FOUND
            }
            DispatchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            DispatchError::UpgradeInFlight { .. } | DispatchError::NotInFlight { .. } => {
                StatusCode::CONFLICT
            }
            DispatchError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self::new(status, err.code(), err.to_string())
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match &err {
            CoreError::HostNotFound(_) | CoreError::Store(StoreError::HostNotFound(_)) => {
                Self::new(StatusCode::NOT_FOUND, "UNKNOWN_HOST", err.to_string())
            }
            CoreError::Store(_) => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE", err.to_string())
            }
            _ => Self::internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", err.body_text())
    }
}

impl<M> From<SendError<M, DispatchError>> for AppError {
    fn from(err: SendError<M, DispatchError>) -> Self {
        match err {
            SendError::HandlerError(e) => e.into(),
            other => Self::engine(&other),
        }
    }
}

impl<M> From<SendError<M, CoreError>> for AppError {
    fn from(err: SendError<M, CoreError>) -> Self {
        match err {
            SendError::HandlerError(e) => e.into(),
            other => Self::engine(&other),
        }
    }
}

impl<M> From<SendError<M, Infallible>> for AppError {
    fn from(err: SendError<M, Infallible>) -> Self {
        Self::engine(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_errors_map_to_status() {
        let cases = [
            (DispatchError::UnknownHost("9".to_string()), StatusCode::NOT_FOUND),
            (
                DispatchError::UnknownComponent {
                    host: "1".to_string(),
                    component: "Python".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                DispatchError::InvalidRequest("target version is empty".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                DispatchError::UpgradeInFlight {
                    host: "1".to_string(),
                    component: "Java".to_string(),
                },
                StatusCode::CONFLICT,
            ),
        ];

        for (err, status) in cases {
            let code = err.code();
            let app: AppError = err.into();
            assert_eq!(app.status, status);
            assert_eq!(app.error.code, code);
        }
    }

    #[test]
    fn test_core_not_found_is_404() {
        let app: AppError = CoreError::HostNotFound("9".to_string()).into();
        assert_eq!(app.status, StatusCode::NOT_FOUND);
    }
}
